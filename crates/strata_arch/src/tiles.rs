//! Physical tile types.
//!
//! A physical tile is the unit of the device grid. A tile contains sub-tiles;
//! each sub-tile provides a number of placement sites, and each site can host
//! any one of the sub-tile's equivalent logical block types.

use crate::ids::LogicalBlockTypeId;
use serde::{Deserialize, Serialize};

/// One sub-tile within a physical tile type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTile {
    /// The name of this sub-tile.
    pub name: String,
    /// The number of sites this sub-tile provides.
    pub capacity: u32,
    /// The logical block types that can be placed at this sub-tile's sites.
    /// A site hosts exactly one of these at a time.
    pub equivalent_sites: Vec<LogicalBlockTypeId>,
}

impl SubTile {
    /// Creates a sub-tile with the given capacity and equivalent sites.
    pub fn new(
        name: impl Into<String>,
        capacity: u32,
        equivalent_sites: Vec<LogicalBlockTypeId>,
    ) -> Self {
        Self {
            name: name.into(),
            capacity,
            equivalent_sites,
        }
    }
}

/// A physical tile type on the device grid.
///
/// Tiles may span multiple grid cells (`width` x `height`); the bottom-left
/// cell is the root and the remaining cells alias it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalTileType {
    /// The name of this tile type (e.g., "clb_tile", "io_tile").
    pub name: String,
    /// The width of the tile in grid cells.
    pub width: u32,
    /// The height of the tile in grid cells.
    pub height: u32,
    /// The sub-tiles contained in this tile.
    pub sub_tiles: Vec<SubTile>,
}

impl PhysicalTileType {
    /// Creates a 1x1 tile type with the given sub-tiles.
    pub fn unit(name: impl Into<String>, sub_tiles: Vec<SubTile>) -> Self {
        Self {
            name: name.into(),
            width: 1,
            height: 1,
            sub_tiles,
        }
    }

    /// Creates a tile type spanning `width` x `height` grid cells.
    pub fn spanning(
        name: impl Into<String>,
        width: u32,
        height: u32,
        sub_tiles: Vec<SubTile>,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            sub_tiles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_tile() {
        let tile = PhysicalTileType::unit(
            "clb_tile",
            vec![SubTile::new("clb_sub", 1, vec![LogicalBlockTypeId::from_raw(0)])],
        );
        assert_eq!(tile.width, 1);
        assert_eq!(tile.height, 1);
        assert_eq!(tile.sub_tiles.len(), 1);
    }

    #[test]
    fn spanning_tile() {
        let tile = PhysicalTileType::spanning("bram_tile", 1, 4, vec![]);
        assert_eq!(tile.width, 1);
        assert_eq!(tile.height, 4);
    }

    #[test]
    fn sub_tile_capacity() {
        let sub = SubTile::new(
            "io_sub",
            8,
            vec![
                LogicalBlockTypeId::from_raw(1),
                LogicalBlockTypeId::from_raw(2),
            ],
        );
        assert_eq!(sub.capacity, 8);
        assert_eq!(sub.equivalent_sites.len(), 2);
    }

    #[test]
    fn serde_roundtrip() {
        let tile = PhysicalTileType::unit(
            "clb_tile",
            vec![SubTile::new("clb_sub", 2, vec![LogicalBlockTypeId::from_raw(0)])],
        );
        let json = serde_json::to_string(&tile).unwrap();
        let restored: PhysicalTileType = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.name, "clb_tile");
        assert_eq!(restored.sub_tiles[0].capacity, 2);
    }
}
