//! FPGA device architecture models for the Strata toolchain.
//!
//! This crate describes the target device to the rest of the flow: the
//! primitive [`ModelLibrary`] (with its dense model index), the logical block
//! types with their pb/mode trees, the physical tile types with their
//! sub-tiles, and the [`DeviceGrid`] that lays tiles out on the die.
//!
//! The description is plain data, built once by the embedder and shared
//! read-only with every flow stage.

#![warn(missing_docs)]

pub mod grid;
pub mod ids;
pub mod models;
pub mod pb;
pub mod tiles;

pub use grid::{DeviceGrid, TileLoc};
pub use ids::{LogicalBlockTypeId, ModelId, TileTypeId};
pub use models::{Model, ModelLibrary};
pub use pb::{LogicalBlockType, Mode, PbContent, PbType};
pub use tiles::{PhysicalTileType, SubTile};

use serde::{Deserialize, Serialize};

/// The complete architecture description consumed by the flow.
///
/// Bundles the model library with the logical block and physical tile type
/// tables. Type IDs index directly into the corresponding vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Architecture {
    /// The primitive model library.
    pub models: ModelLibrary,
    /// All logical block types, indexed by [`LogicalBlockTypeId`].
    pub logical_block_types: Vec<LogicalBlockType>,
    /// All physical tile types, indexed by [`TileTypeId`].
    pub physical_tile_types: Vec<PhysicalTileType>,
}

impl Architecture {
    /// Looks up a physical tile type by name.
    pub fn find_tile_type(&self, name: &str) -> Option<TileTypeId> {
        self.physical_tile_types
            .iter()
            .position(|t| t.name == name)
            .map(|i| TileTypeId::from_raw(i as u32))
    }

    /// Returns the physical tile type with the given ID.
    pub fn tile_type(&self, id: TileTypeId) -> &PhysicalTileType {
        &self.physical_tile_types[id.index()]
    }

    /// Returns the logical block type with the given ID.
    pub fn logical_block_type(&self, id: LogicalBlockTypeId) -> &LogicalBlockType {
        &self.logical_block_types[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_arch() -> Architecture {
        let mut models = ModelLibrary::new();
        let lut = models.add_model("lut4");
        let clb = LogicalBlockType::new("clb", PbType::leaf("lut", 1, lut));
        let tile = PhysicalTileType::unit(
            "clb_tile",
            vec![SubTile::new("clb_sub", 1, vec![LogicalBlockTypeId::from_raw(0)])],
        );
        Architecture {
            models,
            logical_block_types: vec![clb],
            physical_tile_types: vec![tile],
        }
    }

    #[test]
    fn find_tile_type_by_name() {
        let arch = make_arch();
        let id = arch.find_tile_type("clb_tile").unwrap();
        assert_eq!(arch.tile_type(id).name, "clb_tile");
        assert!(arch.find_tile_type("missing").is_none());
    }

    #[test]
    fn logical_block_lookup() {
        let arch = make_arch();
        let lb = arch.logical_block_type(LogicalBlockTypeId::from_raw(0));
        assert_eq!(lb.name, "clb");
    }
}
