//! The device grid.
//!
//! The grid is a dense `layers x width x height` array of physical tile type
//! references. Tiles wider or taller than one cell occupy several cells; the
//! bottom-left cell is the root, and the other cells record their offset back
//! to it. All placement-side spatial queries resolve through the root cell.

use crate::ids::TileTypeId;
use serde::{Deserialize, Serialize};
use strata_common::{InternalError, StrataResult};

/// An integer location on the device grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileLoc {
    /// The x coordinate (column).
    pub x: i32,
    /// The y coordinate (row).
    pub y: i32,
    /// The layer (die) index.
    pub layer: i32,
}

impl TileLoc {
    /// Creates a new tile location.
    pub fn new(x: i32, y: i32, layer: i32) -> Self {
        Self { x, y, layer }
    }
}

/// The dense grid of physical tiles making up the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceGrid {
    width: usize,
    height: usize,
    num_layers: usize,
    /// Tile type of each grid cell, indexed `layer * (w*h) + x * h + y`.
    tile_types: Vec<TileTypeId>,
    /// Horizontal distance from each cell back to its root cell.
    width_offsets: Vec<u32>,
    /// Vertical distance from each cell back to its root cell.
    height_offsets: Vec<u32>,
}

impl DeviceGrid {
    /// Creates a grid with every cell filled by a 1x1 tile of `fill` type.
    pub fn new(width: usize, height: usize, num_layers: usize, fill: TileTypeId) -> Self {
        let num_cells = width * height * num_layers;
        Self {
            width,
            height,
            num_layers,
            tile_types: vec![fill; num_cells],
            width_offsets: vec![0; num_cells],
            height_offsets: vec![0; num_cells],
        }
    }

    fn cell_index(&self, loc: TileLoc) -> usize {
        debug_assert!(loc.x >= 0 && (loc.x as usize) < self.width);
        debug_assert!(loc.y >= 0 && (loc.y as usize) < self.height);
        debug_assert!(loc.layer >= 0 && (loc.layer as usize) < self.num_layers);
        (loc.layer as usize) * self.width * self.height
            + (loc.x as usize) * self.height
            + (loc.y as usize)
    }

    /// Returns the width of the grid.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the grid.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of layers in the grid.
    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    /// Stamps a tile of the given type and footprint with its root at
    /// `(x, y)` on `layer`. All covered cells record offsets back to the root.
    pub fn set_tile(
        &mut self,
        layer: usize,
        x: usize,
        y: usize,
        tile_type: TileTypeId,
        tile_width: u32,
        tile_height: u32,
    ) {
        for dx in 0..tile_width as usize {
            for dy in 0..tile_height as usize {
                let loc = TileLoc::new((x + dx) as i32, (y + dy) as i32, layer as i32);
                let idx = self.cell_index(loc);
                self.tile_types[idx] = tile_type;
                self.width_offsets[idx] = dx as u32;
                self.height_offsets[idx] = dy as u32;
            }
        }
    }

    /// Returns the physical tile type at the given location.
    pub fn tile_type_at(&self, loc: TileLoc) -> TileTypeId {
        self.tile_types[self.cell_index(loc)]
    }

    /// Returns the horizontal offset from the given cell to its root cell.
    pub fn width_offset(&self, loc: TileLoc) -> u32 {
        self.width_offsets[self.cell_index(loc)]
    }

    /// Returns the vertical offset from the given cell to its root cell.
    pub fn height_offset(&self, loc: TileLoc) -> u32 {
        self.height_offsets[self.cell_index(loc)]
    }

    /// Returns `true` if the given cell is the root cell of its tile.
    pub fn is_root(&self, loc: TileLoc) -> bool {
        self.width_offset(loc) == 0 && self.height_offset(loc) == 0
    }

    /// Checks the grid against the architecture it is supposed to describe.
    ///
    /// The grid and the architecture are built separately by the embedder, so
    /// before anything indexes one with ids from the other we require that
    /// every cell references a tile type inside the architecture's table
    /// (`num_tile_types`), and that every non-root cell's offsets land on a
    /// root cell of the same tile type.
    pub fn verify(&self, num_tile_types: usize) -> StrataResult<()> {
        for layer in 0..self.num_layers {
            for x in 0..self.width {
                for y in 0..self.height {
                    let loc = TileLoc::new(x as i32, y as i32, layer as i32);
                    let tile_type = self.tile_type_at(loc);
                    if tile_type.index() >= num_tile_types {
                        return Err(InternalError::new(
                            "device grid",
                            format!(
                                "cell ({x}, {y}) on layer {layer} references tile type \
                                 {tile_type} but the architecture only describes \
                                 {num_tile_types} tile types"
                            ),
                        ));
                    }
                    let w_offset = self.width_offset(loc) as usize;
                    let h_offset = self.height_offset(loc) as usize;
                    if w_offset > x || h_offset > y {
                        return Err(InternalError::new(
                            "device grid",
                            format!(
                                "cell ({x}, {y}) on layer {layer} has offsets \
                                 ({w_offset}, {h_offset}) pointing off the grid"
                            ),
                        ));
                    }
                    let root =
                        TileLoc::new((x - w_offset) as i32, (y - h_offset) as i32, layer as i32);
                    if !self.is_root(root) || self.tile_type_at(root) != tile_type {
                        return Err(InternalError::new(
                            "device grid",
                            format!(
                                "cell ({x}, {y}) on layer {layer} does not alias a root \
                                 cell of its own tile type"
                            ),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
