//! The partial placement: continuous positions for every AP block.
//!
//! A partial placement need not be legal, but its blocks are always on the
//! device and fixed blocks always respect their constraints. Positions are
//! stored as a struct of dense arrays indexed by block ID, since the solver
//! treats the x and y coordinates as separate continuous vectors.

use crate::atoms::FlatPlacementInfo;
use crate::ids::BlockId;
use crate::netlist::{ApNetlist, BlockMobility};
use serde::{Deserialize, Serialize};
use strata_arch::TileLoc;

/// Net-crossing correction factors indexed by `fanout - 1`, used to scale a
/// net's bounding box up to an expected wirelength.
const CROSS_COUNT: [f64; 50] = [
    1.0, 1.0, 1.0, 1.0828, 1.1536, 1.2206, 1.2823, 1.3385, 1.3991, 1.4493, 1.4974, 1.5455, 1.5937,
    1.6418, 1.6899, 1.7304, 1.7709, 1.8114, 1.8519, 1.8924, 1.9288, 1.9652, 2.0015, 2.0379,
    2.0743, 2.1061, 2.1379, 2.1698, 2.2016, 2.2334, 2.2646, 2.2958, 2.3271, 2.3583, 2.3895,
    2.4187, 2.4479, 2.4772, 2.5064, 2.5356, 2.5610, 2.5864, 2.6117, 2.6371, 2.6625, 2.6887,
    2.7148, 2.7410, 2.7671, 2.7933,
];

/// Expected number of channel crossings for a net of the given fanout.
fn wirelength_crossing_count(fanout: usize) -> f64 {
    if fanout == 0 {
        return 0.0;
    }
    if fanout <= CROSS_COUNT.len() {
        CROSS_COUNT[fanout - 1]
    } else {
        2.7933 + 0.02616 * (fanout - CROSS_COUNT.len()) as f64
    }
}

/// A partial placement during the analytical placement flow.
///
/// `x`, `y`, and `layer` are continuous (`f64`); the sub-tile is an integer
/// decided by the legalizers, not the solver. The placement assumes the AP
/// netlist is static: no blocks are added or removed while it is alive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialPlacement {
    /// The x location of each block, indexed by block ID.
    pub block_x_locs: Vec<f64>,
    /// The y location of each block, indexed by block ID.
    pub block_y_locs: Vec<f64>,
    /// The device layer of each block, indexed by block ID.
    pub block_layers: Vec<f64>,
    /// The sub-tile of each block, indexed by block ID.
    pub block_sub_tiles: Vec<i32>,
}

impl PartialPlacement {
    /// Creates the initial placement for the given netlist.
    ///
    /// Moveable blocks start at the (-1, -1, 0, 0) sentinel; fixed blocks
    /// start at their constraint, with unconstrained axes receiving 0.
    pub fn new(netlist: &ApNetlist) -> Self {
        let n = netlist.block_count();
        let mut placement = Self {
            block_x_locs: vec![-1.0; n],
            block_y_locs: vec![-1.0; n],
            block_layers: vec![0.0; n],
            block_sub_tiles: vec![0; n],
        };
        for blk_id in netlist.blocks() {
            if netlist.block_mobility(blk_id) != BlockMobility::Fixed {
                continue;
            }
            let loc = netlist.block_loc(blk_id);
            if let Some(x) = loc.x {
                placement.block_x_locs[blk_id.index()] = f64::from(x);
            }
            if let Some(y) = loc.y {
                placement.block_y_locs[blk_id.index()] = f64::from(y);
            }
            if let Some(layer) = loc.layer {
                placement.block_layers[blk_id.index()] = f64::from(layer);
            }
            if let Some(sub_tile) = loc.sub_tile {
                placement.block_sub_tiles[blk_id.index()] = sub_tile;
            }
        }
        placement
    }

    /// Returns the location of the grid tile containing the given block.
    ///
    /// The floor is taken since a block at x = 0.99999 is still inside the
    /// first tile; blocks are assumed to end up at tile centres, not corners.
    pub fn containing_tile_loc(&self, blk_id: BlockId) -> TileLoc {
        TileLoc::new(
            self.block_x_locs[blk_id.index()].floor() as i32,
            self.block_y_locs[blk_id.index()].floor() as i32,
            self.block_layers[blk_id.index()].floor() as i32,
        )
    }

    /// Computes the half-perimeter wirelength of the current placement.
    ///
    /// Ignored nets are excluded. Positions are used as-is (fractional), so
    /// this is the solver-facing objective value, not a routed-wirelength
    /// estimate.
    pub fn hpwl(&self, netlist: &ApNetlist) -> f64 {
        let mut hpwl = 0.0;
        for net_id in netlist.nets() {
            if netlist.net_is_ignored(net_id) {
                continue;
            }
            let pins = netlist.net_pins(net_id);
            if pins.is_empty() {
                continue;
            }
            let mut min_x = f64::MAX;
            let mut max_x = f64::MIN;
            let mut min_y = f64::MAX;
            let mut max_y = f64::MIN;
            let mut min_z = f64::MAX;
            let mut max_z = f64::MIN;
            for &pin_id in pins {
                let blk = netlist.pin_block(pin_id);
                let x = self.block_x_locs[blk.index()];
                let y = self.block_y_locs[blk.index()];
                let z = self.block_layers[blk.index()];
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
                min_z = min_z.min(z);
                max_z = max_z.max(z);
            }
            hpwl += max_x - min_x + max_y - min_y + max_z - min_z;
        }
        hpwl
    }

    /// Estimates the post-placement wirelength of the current placement.
    ///
    /// Global nets (clocks, resets) are excluded to align with downstream
    /// wirelength estimators. Positions are floored to the containing tile,
    /// and each net's bounding box is scaled by the expected crossing count
    /// for its fanout.
    pub fn estimate_post_placement_wirelength(&self, netlist: &ApNetlist) -> f64 {
        let mut total = 0.0;
        for net_id in netlist.nets() {
            if netlist.net_is_global(net_id) {
                continue;
            }
            let pins = netlist.net_pins(net_id);
            if pins.is_empty() {
                continue;
            }
            let crossing = wirelength_crossing_count(pins.len());
            let mut min_x = f64::MAX;
            let mut max_x = f64::MIN;
            let mut min_y = f64::MAX;
            let mut max_y = f64::MIN;
            let mut min_z = f64::MAX;
            let mut max_z = f64::MIN;
            for &pin_id in pins {
                let blk = netlist.pin_block(pin_id);
                let x = self.block_x_locs[blk.index()];
                let y = self.block_y_locs[blk.index()];
                let z = self.block_layers[blk.index()];
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
                min_z = min_z.min(z);
                max_z = max_z.max(z);
            }
            let tile_dx = max_x.floor() - min_x.floor();
            let tile_dy = max_y.floor() - min_y.floor();
            let tile_dz = max_z.floor() - min_z.floor();
            total += (tile_dx + tile_dy + tile_dz) * crossing;
        }
        total
    }

    /// Verifies the x and y locations.
    ///
    /// Ensures every block has a finite in-range location and every fixed
    /// block matches its constraint on constrained axes. When a valid
    /// flat-placement hint is present, fixed positions are offset by
    /// (0.5, 0.5) before the comparison, since hint files store tile anchor
    /// positions rather than tile centres.
    pub fn verify_locs(
        &self,
        netlist: &ApNetlist,
        grid_width: usize,
        grid_height: usize,
        flat_placement: &FlatPlacementInfo,
    ) -> bool {
        if self.block_x_locs.len() != netlist.block_count() {
            return false;
        }
        if self.block_y_locs.len() != netlist.block_count() {
            return false;
        }
        for blk_id in netlist.blocks() {
            let mut x_pos = self.block_x_locs[blk_id.index()];
            let mut y_pos = self.block_y_locs[blk_id.index()];
            if x_pos.is_nan() || x_pos < 0.0 || x_pos >= grid_width as f64 {
                return false;
            }
            if y_pos.is_nan() || y_pos < 0.0 || y_pos >= grid_height as f64 {
                return false;
            }
            if netlist.block_mobility(blk_id) == BlockMobility::Fixed {
                let fixed_loc = netlist.block_loc(blk_id);
                if flat_placement.valid {
                    x_pos += 0.5;
                    y_pos += 0.5;
                }
                if let Some(fx) = fixed_loc.x {
                    if x_pos != f64::from(fx) {
                        return false;
                    }
                }
                if let Some(fy) = fixed_loc.y {
                    if y_pos != f64::from(fy) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Verifies the layer numbers.
    pub fn verify_layers(&self, netlist: &ApNetlist, grid_num_layers: usize) -> bool {
        if self.block_layers.len() != netlist.block_count() {
            return false;
        }
        for blk_id in netlist.blocks() {
            let layer = self.block_layers[blk_id.index()];
            if layer.is_nan() || layer < 0.0 || layer >= grid_num_layers as f64 {
                return false;
            }
            if netlist.block_mobility(blk_id) == BlockMobility::Fixed {
                if let Some(fixed_layer) = netlist.block_loc(blk_id).layer {
                    if layer != f64::from(fixed_layer) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Verifies the sub-tiles.
    ///
    /// Only non-negativity is checked: nothing downstream of the partial
    /// legalizer relies on the sub-tile actually existing in its tile yet.
    pub fn verify_sub_tiles(&self, netlist: &ApNetlist) -> bool {
        if self.block_sub_tiles.len() != netlist.block_count() {
            return false;
        }
        for blk_id in netlist.blocks() {
            let sub_tile = self.block_sub_tiles[blk_id.index()];
            if sub_tile < 0 {
                return false;
            }
            if netlist.block_mobility(blk_id) == BlockMobility::Fixed {
                if let Some(fixed_sub_tile) = netlist.block_loc(blk_id).sub_tile {
                    if sub_tile != fixed_sub_tile {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Runs all verification checks against the given device dimensions.
    pub fn verify(
        &self,
        netlist: &ApNetlist,
        grid_width: usize,
        grid_height: usize,
        grid_num_layers: usize,
        flat_placement: &FlatPlacementInfo,
    ) -> bool {
        self.verify_locs(netlist, grid_width, grid_height, flat_placement)
            && self.verify_layers(netlist, grid_num_layers)
            && self.verify_sub_tiles(netlist)
    }
}
