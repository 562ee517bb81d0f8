//! Density accounting over the device grid.
//!
//! The density manager partitions the device into bins (one per root tile
//! location), tracks per-bin capacity and utilization in primitive-vector
//! space, and keeps the set of overfilled bins current as blocks move. It is
//! the bridge between the continuous partial placement and the discrete
//! legalization state: placements are imported into bins, spread between
//! bins, and exported back out.

use crate::atoms::AtomNetlist;
use crate::bins::PlacementBins;
use crate::error::{ApError, ApResult};
use crate::ids::{BinId, BlockId};
use crate::mass::MassCalculator;
use crate::netlist::{ApNetlist, BlockMobility};
use crate::placement::PartialPlacement;
use crate::primitive_vector::PrimitiveVector;
use std::collections::HashSet;
use strata_arch::{Architecture, DeviceGrid, TileLoc};
use strata_common::{Point, Rect};
use strata_diagnostics::{Diagnostic, DiagnosticSink, Stage};

/// Blocks are kept strictly inside their bin's region on export; this is how
/// far inside the boundary they land.
const BIN_REGION_EPSILON: f64 = 0.0001;

/// How over-capacity the given utilization is.
fn calc_bin_overfill(utilization: &PrimitiveVector, capacity: &PrimitiveVector) -> PrimitiveVector {
    let mut overfill = utilization - capacity;
    overfill.relu();
    overfill
}

/// How under-capacity the given utilization is.
fn calc_bin_underfill(utilization: &PrimitiveVector, capacity: &PrimitiveVector) -> PrimitiveVector {
    let mut underfill = capacity - utilization;
    underfill.relu();
    underfill
}

/// Parses the user's target density override strings.
///
/// Returns one factor per physical tile type, defaulting to 1.0. An empty
/// list or the single string `auto` keeps every default. Anything else must
/// be of the form `tile_type:factor` with a positive factor and a known tile
/// type name.
fn parse_target_densities(
    target_density_arg_strs: &[String],
    arch: &Architecture,
) -> ApResult<Vec<f64>> {
    let mut densities = vec![1.0; arch.physical_tile_types.len()];
    if target_density_arg_strs.is_empty() {
        return Ok(densities);
    }
    if target_density_arg_strs.len() == 1 && target_density_arg_strs[0] == "auto" {
        return Ok(densities);
    }
    for arg in target_density_arg_strs {
        let Some((name, factor_str)) = arg.split_once(':') else {
            return Err(ApError::MalformedTargetDensity(arg.clone()));
        };
        let factor: f64 = factor_str
            .parse()
            .map_err(|_| ApError::MalformedTargetDensity(arg.clone()))?;
        let Some(tile_type) = arch.find_tile_type(name) else {
            return Err(ApError::UnknownTileType(name.to_string()));
        };
        if factor <= 0.0 {
            return Err(ApError::InvalidTargetDensity {
                tile_type: name.to_string(),
                factor,
            });
        }
        densities[tile_type.index()] = factor;
    }
    Ok(densities)
}

/// Bins, capacities, utilizations, and the overfilled-bin set.
///
/// The manager exclusively owns its bins and the spatial index; the rest of
/// the flow goes through [`insert_block`](Self::insert_block) /
/// [`remove_block`](Self::remove_block) and the import/export pair.
#[derive(Debug)]
pub struct DensityManager {
    bins: PlacementBins,
    mass_calculator: MassCalculator,
    bin_capacities: Vec<PrimitiveVector>,
    bin_utilizations: Vec<PrimitiveVector>,
    bin_overfills: Vec<PrimitiveVector>,
    bin_underfills: Vec<PrimitiveVector>,
    overfilled_bins: HashSet<BinId>,
    /// The device layer of each bin, indexed by bin ID.
    bin_layers: Vec<usize>,
    /// Bin at each grid cell, indexed `layer * (w*h) + x * h + y`.
    bin_spatial_lookup: Vec<BinId>,
    grid_width: usize,
    grid_height: usize,
    grid_num_layers: usize,
}

impl DensityManager {
    /// Builds the bins from the device grid and computes their capacities.
    ///
    /// One bin is created per root tile location; non-root cells alias their
    /// root's bin in the spatial index. Capacities are scaled by the user's
    /// target density overrides and projected onto the primitive dimensions
    /// the netlist actually uses.
    pub fn new(
        ap_netlist: &ApNetlist,
        atom_netlist: &AtomNetlist,
        mass_calculator: MassCalculator,
        arch: &Architecture,
        grid: &DeviceGrid,
        target_density_arg_strs: &[String],
        sink: &DiagnosticSink,
    ) -> ApResult<Self> {
        // Everything below indexes the architecture with ids taken from the
        // grid; reject a grid that disagrees with the architecture up front.
        grid.verify(arch.physical_tile_types.len())?;

        let target_densities = parse_target_densities(target_density_arg_strs, arch)?;
        let density_summary: Vec<String> = arch
            .physical_tile_types
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}:{:.1}", t.name, target_densities[i]))
            .collect();
        sink.emit(Diagnostic::note(
            Stage::DensityManager,
            format!("using target densities: {}", density_summary.join(" ")),
        ));

        let (width, height, num_layers) = (grid.width(), grid.height(), grid.num_layers());
        let mut bins = PlacementBins::new(ap_netlist);
        let mut bin_spatial_lookup = vec![BinId::from_raw(0); width * height * num_layers];
        let mut bin_tile_types = Vec::new();
        let mut bin_layers = Vec::new();
        for layer in 0..num_layers {
            for x in 0..width {
                for y in 0..height {
                    let loc = TileLoc::new(x as i32, y as i32, layer as i32);
                    let cell = layer * width * height + x * height + y;
                    let w_offset = grid.width_offset(loc) as usize;
                    let h_offset = grid.height_offset(loc) as usize;
                    if w_offset != 0 || h_offset != 0 {
                        // Non-root cells alias the root tile's bin. The root
                        // is always visited first since it is below and to
                        // the left of the cells it covers.
                        let root_cell =
                            layer * width * height + (x - w_offset) * height + (y - h_offset);
                        bin_spatial_lookup[cell] = bin_spatial_lookup[root_cell];
                        continue;
                    }
                    let tile_type = grid.tile_type_at(loc);
                    let tile = arch.tile_type(tile_type);
                    let region = Rect::new(
                        Point::new(x as f64, y as f64),
                        Point::new(x as f64 + f64::from(tile.width), y as f64 + f64::from(tile.height)),
                    );
                    let bin_id = bins.create_bin(region);
                    bin_spatial_lookup[cell] = bin_id;
                    bin_tile_types.push(tile_type);
                    bin_layers.push(layer);
                }
            }
        }

        // Only keep capacity in the dimensions the netlist actually uses;
        // unused dimensions would bloat every comparison.
        let mut used_dims_mask = PrimitiveVector::new();
        for atom_id in atom_netlist.blocks() {
            used_dims_mask.set(atom_netlist.block_model(atom_id).index(), 1.0);
        }

        let mut bin_capacities = Vec::with_capacity(bins.bin_count());
        for &tile_type in &bin_tile_types {
            let mut capacity = mass_calculator
                .physical_tile_type_capacity(tile_type)
                .clone();
            capacity *= target_densities[tile_type.index()];
            capacity.project(&used_dims_mask);
            bin_capacities.push(capacity);
        }

        let num_bins = bins.bin_count();
        let bin_utilizations = vec![PrimitiveVector::new(); num_bins];
        let mut bin_overfills = Vec::with_capacity(num_bins);
        let mut bin_underfills = Vec::with_capacity(num_bins);
        for capacity in &bin_capacities {
            bin_overfills.push(calc_bin_overfill(&PrimitiveVector::new(), capacity));
            bin_underfills.push(calc_bin_underfill(&PrimitiveVector::new(), capacity));
        }

        Ok(Self {
            bins,
            mass_calculator,
            bin_capacities,
            bin_utilizations,
            bin_overfills,
            bin_underfills,
            overfilled_bins: HashSet::new(),
            bin_layers,
            bin_spatial_lookup,
            grid_width: width,
            grid_height: height,
            grid_num_layers: num_layers,
        })
    }

    /// Returns the bin containing the given continuous point.
    ///
    /// Coordinates are floored to the containing grid cell; points at the
    /// upper device edge fall into the last cell.
    pub fn get_bin(&self, x: f64, y: f64, layer: f64) -> BinId {
        let x_pos = (x.floor() as usize).min(self.grid_width - 1);
        let y_pos = (y.floor() as usize).min(self.grid_height - 1);
        let layer_pos = (layer.floor() as usize).min(self.grid_num_layers - 1);
        self.bin_spatial_lookup
            [layer_pos * self.grid_width * self.grid_height + x_pos * self.grid_height + y_pos]
    }

    /// Returns the bin container.
    pub fn placement_bins(&self) -> &PlacementBins {
        &self.bins
    }

    /// Returns the mass calculator.
    pub fn mass_calculator(&self) -> &MassCalculator {
        &self.mass_calculator
    }

    /// Returns the capacity of the given bin.
    pub fn bin_capacity(&self, bin_id: BinId) -> &PrimitiveVector {
        &self.bin_capacities[bin_id.index()]
    }

    /// Returns the current utilization of the given bin.
    pub fn bin_utilization(&self, bin_id: BinId) -> &PrimitiveVector {
        &self.bin_utilizations[bin_id.index()]
    }

    /// Returns the overfill (ReLU of utilization - capacity) of the given bin.
    pub fn bin_overfill(&self, bin_id: BinId) -> &PrimitiveVector {
        &self.bin_overfills[bin_id.index()]
    }

    /// Returns the underfill (ReLU of capacity - utilization) of the given bin.
    pub fn bin_underfill(&self, bin_id: BinId) -> &PrimitiveVector {
        &self.bin_underfills[bin_id.index()]
    }

    /// Returns `true` if the given bin is overfilled in any dimension.
    pub fn bin_is_overfilled(&self, bin_id: BinId) -> bool {
        self.bin_overfills[bin_id.index()].is_non_zero()
    }

    /// Returns the set of currently overfilled bins.
    pub fn overfilled_bins(&self) -> &HashSet<BinId> {
        &self.overfilled_bins
    }

    /// Returns the placeable device dimensions as (width, height, layers).
    pub fn placeable_region_size(&self) -> (usize, usize, usize) {
        (self.grid_width, self.grid_height, self.grid_num_layers)
    }

    /// Returns the device layer the given bin sits on.
    pub fn bin_layer(&self, bin_id: BinId) -> usize {
        self.bin_layers[bin_id.index()]
    }

    fn update_bin_fill(&mut self, bin_id: BinId) {
        let idx = bin_id.index();
        self.bin_overfills[idx] =
            calc_bin_overfill(&self.bin_utilizations[idx], &self.bin_capacities[idx]);
        self.bin_underfills[idx] =
            calc_bin_underfill(&self.bin_utilizations[idx], &self.bin_capacities[idx]);
        if self.bin_overfills[idx].is_non_zero() {
            self.overfilled_bins.insert(bin_id);
        } else {
            self.overfilled_bins.remove(&bin_id);
        }
    }

    /// Inserts a block into a bin, updating utilization, overfill, underfill,
    /// and the overfilled-bin set.
    pub fn insert_block(&mut self, blk_id: BlockId, bin_id: BinId) {
        self.bins.add_block_to_bin(blk_id, bin_id);
        let mass = self.mass_calculator.block_mass(blk_id).clone();
        self.bin_utilizations[bin_id.index()] += &mass;
        self.update_bin_fill(bin_id);
    }

    /// Removes a block from a bin, updating utilization, overfill, underfill,
    /// and the overfilled-bin set.
    pub fn remove_block(&mut self, blk_id: BlockId, bin_id: BinId) {
        self.bins.remove_block_from_bin(blk_id, bin_id);
        let mass = self.mass_calculator.block_mass(blk_id).clone();
        self.bin_utilizations[bin_id.index()] -= &mass;
        self.update_bin_fill(bin_id);
    }

    /// Empties every bin and resets all utilization state.
    pub fn empty_bins(&mut self) {
        for bin_id in (0..self.bins.bin_count()).map(|i| BinId::from_raw(i as u32)) {
            self.bins.remove_all_blocks_from_bin(bin_id);
            let idx = bin_id.index();
            self.bin_utilizations[idx].clear();
            self.bin_overfills[idx].clear();
            self.bin_underfills[idx] = self.bin_capacities[idx].clone();
        }
        self.overfilled_bins.clear();
    }

    /// Empties the bins and inserts every block into the bin containing its
    /// current placement coordinate.
    pub fn import_placement(&mut self, placement: &PartialPlacement) {
        self.empty_bins();
        for blk_idx in 0..placement.block_x_locs.len() {
            let blk_id = BlockId::from_raw(blk_idx as u32);
            let bin_id = self.get_bin(
                placement.block_x_locs[blk_idx],
                placement.block_y_locs[blk_idx],
                placement.block_layers[blk_idx],
            );
            self.insert_block(blk_id, bin_id);
        }
    }

    /// The point inside `region` closest to the block's current position.
    ///
    /// Blocks may sit infinitely close to a bin boundary but never exactly on
    /// it, so the region is inset by a small epsilon on each side.
    pub fn block_location_in_bin(
        &self,
        blk_id: BlockId,
        region: &Rect,
        placement: &PartialPlacement,
    ) -> Point {
        let x = placement.block_x_locs[blk_id.index()]
            .clamp(region.xmin + BIN_REGION_EPSILON, region.xmax - BIN_REGION_EPSILON);
        let y = placement.block_y_locs[blk_id.index()]
            .clamp(region.ymin + BIN_REGION_EPSILON, region.ymax - BIN_REGION_EPSILON);
        Point::new(x, y)
    }

    /// Writes the bin state back into the placement: every moveable block is
    /// clamped into the region of the bin it currently occupies. Layers and
    /// sub-tiles are preserved.
    pub fn export_placement(&self, netlist: &ApNetlist, placement: &mut PartialPlacement) {
        for blk_id in netlist.blocks() {
            if netlist.block_mobility(blk_id) == BlockMobility::Fixed {
                continue;
            }
            let Some(bin_id) = self.bins.block_bin(blk_id) else {
                continue;
            };
            let pos = self.block_location_in_bin(blk_id, self.bins.bin_region(bin_id), placement);
            placement.block_x_locs[blk_id.index()] = pos.x;
            placement.block_y_locs[blk_id.index()] = pos.y;
        }
    }

    /// Verifies the internal consistency of the density state.
    ///
    /// Checks that every block is binned, that utilization matches bin
    /// contents, that overfill/underfill are the ReLU of the capacity
    /// difference, that nothing is negative, and that the overfilled-bin set
    /// matches a recomputation.
    pub fn verify(&self, netlist: &ApNetlist) -> bool {
        if !self.bins.verify() {
            return false;
        }
        for blk_id in netlist.blocks() {
            if self.bins.block_bin(blk_id).is_none() {
                return false;
            }
        }
        for bin_id in self.bins.bins() {
            let idx = bin_id.index();
            let mut calc_utilization = PrimitiveVector::new();
            for &blk_id in self.bins.bin_contained_blocks(bin_id) {
                calc_utilization += self.mass_calculator.block_mass(blk_id);
            }
            if self.bin_utilizations[idx] != calc_utilization {
                return false;
            }
            let calc_overfill =
                calc_bin_overfill(&self.bin_utilizations[idx], &self.bin_capacities[idx]);
            if self.bin_overfills[idx] != calc_overfill {
                return false;
            }
            let calc_underfill =
                calc_bin_underfill(&self.bin_utilizations[idx], &self.bin_capacities[idx]);
            if self.bin_underfills[idx] != calc_underfill {
                return false;
            }
            if !self.bin_overfills[idx].is_non_negative()
                || !self.bin_underfills[idx].is_non_negative()
                || !self.bin_capacities[idx].is_non_negative()
                || !self.bin_utilizations[idx].is_non_negative()
            {
                return false;
            }
            let should_be_overfilled = self.bin_overfills[idx].is_non_zero();
            if should_be_overfilled != self.overfilled_bins.contains(&bin_id) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::Prepacker;
    use strata_arch::{
        LogicalBlockType, LogicalBlockTypeId, ModelLibrary, PbType, PhysicalTileType, SubTile,
        TileTypeId,
    };

    /// One model, one logical type, one 1x1 tile type of capacity one, on a
    /// `width x 1` strip. Each netlist block is one atom of the model.
    fn make_strip(
        num_blocks: u32,
        width: usize,
    ) -> (ApNetlist, AtomNetlist, Prepacker, Architecture, DeviceGrid) {
        let mut models = ModelLibrary::new();
        let m0 = models.add_model("m0");
        let lb = LogicalBlockType::new("lb", PbType::leaf("prim", 1, m0));
        let tile = PhysicalTileType::unit(
            "tile0",
            vec![SubTile::new("sub0", 1, vec![LogicalBlockTypeId::from_raw(0)])],
        );
        let arch = Architecture {
            models,
            logical_block_types: vec![lb],
            physical_tile_types: vec![tile],
        };
        let grid = DeviceGrid::new(width, 1, 1, TileTypeId::from_raw(0));

        let mut atoms = AtomNetlist::new();
        let mut prepacker = Prepacker::new();
        let mut nl = ApNetlist::new("test");
        for i in 0..num_blocks {
            let atom = atoms.add_atom(format!("atom{i}"), m0);
            let mol = prepacker.add_molecule(vec![Some(atom)]);
            nl.create_block(format!("b{i}"), mol);
        }
        (nl, atoms, prepacker, arch, grid)
    }

    fn make_manager(
        nl: &ApNetlist,
        atoms: &AtomNetlist,
        prepacker: &Prepacker,
        arch: &Architecture,
        grid: &DeviceGrid,
        density_args: &[String],
    ) -> ApResult<DensityManager> {
        let calc = MassCalculator::new(nl, prepacker, atoms, arch)?;
        DensityManager::new(
            nl,
            atoms,
            calc,
            arch,
            grid,
            density_args,
            &DiagnosticSink::new(),
        )
    }

    #[test]
    fn one_bin_per_root_tile() {
        let (nl, atoms, prepacker, arch, grid) = make_strip(1, 3);
        let mgr = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &[]).unwrap();
        assert_eq!(mgr.placement_bins().bin_count(), 3);
        assert_ne!(mgr.get_bin(0.5, 0.5, 0.0), mgr.get_bin(1.5, 0.5, 0.0));
        // Capacity comes from the tile type: one m0 per tile.
        let bin = mgr.get_bin(0.0, 0.0, 0.0);
        assert_eq!(mgr.bin_capacity(bin).get(0), 1.0);
    }

    #[test]
    fn spanning_tile_aliases_to_root_bin() {
        let (nl, atoms, prepacker, mut arch, _) = make_strip(0, 2);
        arch.physical_tile_types
            .push(PhysicalTileType::spanning("tall", 1, 2, vec![]));
        let mut grid = DeviceGrid::new(2, 2, 1, TileTypeId::from_raw(0));
        grid.set_tile(0, 1, 0, TileTypeId::from_raw(1), 1, 2);
        let mgr = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &[]).unwrap();
        // Three bins: (0,0), (0,1), and the tall tile rooted at (1,0).
        assert_eq!(mgr.placement_bins().bin_count(), 3);
        assert_eq!(mgr.get_bin(1.5, 0.5, 0.0), mgr.get_bin(1.5, 1.5, 0.0));
        let tall_bin = mgr.get_bin(1.5, 1.5, 0.0);
        assert_eq!(mgr.placement_bins().bin_region(tall_bin).height(), 2.0);
    }

    #[test]
    fn insert_and_remove_maintain_fill_state() {
        let (nl, atoms, prepacker, arch, grid) = make_strip(2, 2);
        let mut mgr = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &[]).unwrap();
        let bin = mgr.get_bin(0.5, 0.5, 0.0);
        let b0 = BlockId::from_raw(0);
        let b1 = BlockId::from_raw(1);

        mgr.insert_block(b0, bin);
        assert!(!mgr.bin_is_overfilled(bin));
        assert!(mgr.overfilled_bins().is_empty());
        assert_eq!(mgr.bin_underfill(bin).get(0), 0.0);

        mgr.insert_block(b1, bin);
        assert!(mgr.bin_is_overfilled(bin));
        assert_eq!(mgr.bin_overfill(bin).get(0), 1.0);
        assert!(mgr.overfilled_bins().contains(&bin));
        assert!(mgr.verify(&nl));

        // Removing drops the bin out of the overfilled set on the same update.
        mgr.remove_block(b1, bin);
        assert!(!mgr.bin_is_overfilled(bin));
        assert!(mgr.overfilled_bins().is_empty());
    }

    #[test]
    fn import_assigns_blocks_to_containing_bins() {
        let (nl, atoms, prepacker, arch, grid) = make_strip(2, 2);
        let mut mgr = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &[]).unwrap();
        let mut placement = PartialPlacement::new(&nl);
        placement.block_x_locs = vec![0.25, 0.25];
        placement.block_y_locs = vec![0.5, 0.5];
        mgr.import_placement(&placement);

        let bin0 = mgr.get_bin(0.25, 0.5, 0.0);
        assert_eq!(mgr.placement_bins().bin_contained_blocks(bin0).len(), 2);
        assert_eq!(mgr.bin_overfill(bin0).get(0), 1.0);
        assert!(mgr.verify(&nl));
    }

    #[test]
    fn export_clamps_strictly_inside_bin() {
        let (nl, atoms, prepacker, arch, grid) = make_strip(1, 2);
        let mut mgr = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &[]).unwrap();
        let mut placement = PartialPlacement::new(&nl);
        placement.block_x_locs = vec![0.25];
        placement.block_y_locs = vec![0.5];
        mgr.import_placement(&placement);

        // Move the block to the other bin, then export.
        let b0 = BlockId::from_raw(0);
        let src = mgr.get_bin(0.25, 0.5, 0.0);
        let dst = mgr.get_bin(1.5, 0.5, 0.0);
        mgr.remove_block(b0, src);
        mgr.insert_block(b0, dst);
        mgr.export_placement(&nl, &mut placement);

        let x = placement.block_x_locs[0];
        let y = placement.block_y_locs[0];
        let region = mgr.placement_bins().bin_region(dst);
        assert!(x > region.xmin && x < region.xmax);
        assert!(y > region.ymin && y < region.ymax);
        // Layers and sub-tiles are untouched.
        assert_eq!(placement.block_layers[0], 0.0);
        assert_eq!(placement.block_sub_tiles[0], 0);
    }

    #[test]
    fn export_preserves_fixed_blocks() {
        let (mut nl, atoms, prepacker, arch, grid) = make_strip(1, 2);
        nl.set_block_loc(
            BlockId::from_raw(0),
            crate::netlist::FixedBlockLoc {
                x: Some(0),
                y: Some(0),
                layer: Some(0),
                sub_tile: Some(0),
            },
        );
        let mut mgr = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &[]).unwrap();
        let mut placement = PartialPlacement::new(&nl);
        mgr.import_placement(&placement);
        mgr.export_placement(&nl, &mut placement);
        assert_eq!(placement.block_x_locs[0], 0.0);
        assert_eq!(placement.block_y_locs[0], 0.0);
    }

    #[test]
    fn target_density_scales_capacity() {
        let (nl, atoms, prepacker, arch, grid) = make_strip(1, 2);
        let args = vec!["tile0:0.5".to_string()];
        let mgr = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &args).unwrap();
        for bin_id in mgr.placement_bins().bins() {
            assert_eq!(mgr.bin_capacity(bin_id).get(0), 0.5);
        }
    }

    #[test]
    fn target_density_auto_and_empty_default_to_one() {
        let (nl, atoms, prepacker, arch, grid) = make_strip(1, 2);
        let mgr = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &[]).unwrap();
        let bin = mgr.get_bin(0.0, 0.0, 0.0);
        assert_eq!(mgr.bin_capacity(bin).get(0), 1.0);

        let args = vec!["auto".to_string()];
        let mgr = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &args).unwrap();
        let bin = mgr.get_bin(0.0, 0.0, 0.0);
        assert_eq!(mgr.bin_capacity(bin).get(0), 1.0);
    }

    #[test]
    fn target_density_zero_is_fatal() {
        let (nl, atoms, prepacker, arch, grid) = make_strip(1, 2);
        let args = vec!["tile0:0".to_string()];
        let err = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &args).unwrap_err();
        assert!(matches!(err, ApError::InvalidTargetDensity { .. }));

        let args = vec!["tile0:-1.5".to_string()];
        let err = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &args).unwrap_err();
        assert!(matches!(err, ApError::InvalidTargetDensity { .. }));
    }

    #[test]
    fn target_density_unknown_tile_is_fatal() {
        let (nl, atoms, prepacker, arch, grid) = make_strip(1, 2);
        let args = vec!["mystery:0.5".to_string()];
        let err = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &args).unwrap_err();
        assert!(matches!(err, ApError::UnknownTileType(_)));
    }

    #[test]
    fn grid_referencing_unknown_tile_type_is_fatal() {
        let (nl, atoms, prepacker, arch, _) = make_strip(1, 2);
        // The strip architecture has a single tile type; a grid filled with
        // tile type 5 cannot belong to it.
        let grid = DeviceGrid::new(2, 1, 1, TileTypeId::from_raw(5));
        let err = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &[]).unwrap_err();
        assert!(matches!(err, ApError::Inconsistent(_)));
    }

    #[test]
    fn target_density_malformed_is_fatal() {
        let (nl, atoms, prepacker, arch, grid) = make_strip(1, 2);
        for bad in ["tile0", "tile0:abc"] {
            let args = vec![bad.to_string()];
            let err = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &args).unwrap_err();
            assert!(matches!(err, ApError::MalformedTargetDensity(_)));
        }
    }

    #[test]
    fn capacity_projected_onto_used_dims() {
        // Architecture with two models but a netlist that only uses m0: the
        // m1 capacity dimension is zeroed.
        let mut models = ModelLibrary::new();
        let m0 = models.add_model("m0");
        let m1 = models.add_model("m1");
        let lb0 = LogicalBlockType::new("lb0", PbType::leaf("p0", 1, m0));
        let lb1 = LogicalBlockType::new("lb1", PbType::leaf("p1", 1, m1));
        let tile = PhysicalTileType::unit(
            "tile0",
            vec![
                SubTile::new("s0", 1, vec![LogicalBlockTypeId::from_raw(0)]),
                SubTile::new("s1", 1, vec![LogicalBlockTypeId::from_raw(1)]),
            ],
        );
        let arch = Architecture {
            models,
            logical_block_types: vec![lb0, lb1],
            physical_tile_types: vec![tile],
        };
        let grid = DeviceGrid::new(1, 1, 1, TileTypeId::from_raw(0));

        let mut atoms = AtomNetlist::new();
        let mut prepacker = Prepacker::new();
        let mut nl = ApNetlist::new("test");
        let atom = atoms.add_atom("a0", m0);
        let mol = prepacker.add_molecule(vec![Some(atom)]);
        nl.create_block("b0", mol);

        let calc = MassCalculator::new(&nl, &prepacker, &atoms, &arch).unwrap();
        // The raw tile capacity has both dims.
        assert_eq!(
            calc.physical_tile_type_capacity(TileTypeId::from_raw(0)).get(m1.index()),
            1.0
        );
        let mgr = DensityManager::new(
            &nl,
            &atoms,
            calc,
            &arch,
            &grid,
            &[],
            &DiagnosticSink::new(),
        )
        .unwrap();
        let bin = mgr.get_bin(0.0, 0.0, 0.0);
        assert_eq!(mgr.bin_capacity(bin).get(m0.index()), 1.0);
        assert_eq!(mgr.bin_capacity(bin).get(m1.index()), 0.0);
    }

    #[test]
    fn empty_bins_resets_state() {
        let (nl, atoms, prepacker, arch, grid) = make_strip(2, 2);
        let mut mgr = make_manager(&nl, &atoms, &prepacker, &arch, &grid, &[]).unwrap();
        let mut placement = PartialPlacement::new(&nl);
        placement.block_x_locs = vec![0.25, 0.25];
        placement.block_y_locs = vec![0.5, 0.5];
        mgr.import_placement(&placement);
        assert!(!mgr.overfilled_bins().is_empty());

        mgr.empty_bins();
        assert!(mgr.overfilled_bins().is_empty());
        for bin_id in mgr.placement_bins().bins() {
            assert!(mgr.bin_utilization(bin_id).is_zero());
            assert!(mgr.bin_overfill(bin_id).is_zero());
            assert_eq!(mgr.bin_underfill(bin_id), mgr.bin_capacity(bin_id));
        }
    }
}
