//! Spatial bins over the device grid.
//!
//! Flat placement lets blocks sit anywhere in continuous space; to reason
//! about density and legality, blocks are binned spatially. Each bin covers a
//! rectangular region of the grid and holds the set of blocks currently
//! assigned to it. This container only tracks membership; how the device is
//! split into bins and what the bins can hold is decided by the density
//! manager.

use crate::ids::{BinId, BlockId};
use crate::netlist::ApNetlist;
use std::collections::HashSet;
use strata_common::Rect;

/// One bin covering a rectangular region of the device.
#[derive(Debug, Clone)]
pub struct Bin {
    /// The unique ID of this bin.
    pub id: BinId,
    /// The region of the device this bin covers.
    pub region: Rect,
    /// The blocks currently assigned to this bin.
    pub contained_blocks: HashSet<BlockId>,
}

/// The container of all bins, with a block-to-bin back map.
#[derive(Debug, Clone)]
pub struct PlacementBins {
    bins: Vec<Bin>,
    /// The bin each block is currently in, indexed by block ID.
    block_bin: Vec<Option<BinId>>,
}

impl PlacementBins {
    /// Creates an empty container sized for the given netlist.
    pub fn new(netlist: &ApNetlist) -> Self {
        Self {
            bins: Vec::new(),
            block_bin: vec![None; netlist.block_count()],
        }
    }

    /// Creates a bin covering the given region and returns its ID.
    pub fn create_bin(&mut self, region: Rect) -> BinId {
        let id = BinId::from_raw(self.bins.len() as u32);
        self.bins.push(Bin {
            id,
            region,
            contained_blocks: HashSet::new(),
        });
        id
    }

    /// Returns an iterator over all bin IDs.
    pub fn bins(&self) -> impl Iterator<Item = BinId> + '_ {
        (0..self.bins.len()).map(|i| BinId::from_raw(i as u32))
    }

    /// Returns the number of bins.
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Returns the region the given bin covers.
    pub fn bin_region(&self, bin_id: BinId) -> &Rect {
        &self.bins[bin_id.index()].region
    }

    /// Returns the blocks contained in the given bin.
    pub fn bin_contained_blocks(&self, bin_id: BinId) -> &HashSet<BlockId> {
        &self.bins[bin_id.index()].contained_blocks
    }

    /// Returns the bin the given block is currently in, if any.
    pub fn block_bin(&self, blk_id: BlockId) -> Option<BinId> {
        self.block_bin[blk_id.index()]
    }

    /// Adds the given block to the given bin. The block must not already be
    /// in a bin.
    pub fn add_block_to_bin(&mut self, blk_id: BlockId, bin_id: BinId) {
        debug_assert!(self.block_bin[blk_id.index()].is_none());
        self.bins[bin_id.index()].contained_blocks.insert(blk_id);
        self.block_bin[blk_id.index()] = Some(bin_id);
    }

    /// Removes the given block from the given bin. The bin must contain the
    /// block.
    pub fn remove_block_from_bin(&mut self, blk_id: BlockId, bin_id: BinId) {
        debug_assert_eq!(self.block_bin[blk_id.index()], Some(bin_id));
        self.bins[bin_id.index()].contained_blocks.remove(&blk_id);
        self.block_bin[blk_id.index()] = None;
    }

    /// Removes all blocks from the given bin.
    pub fn remove_all_blocks_from_bin(&mut self, bin_id: BinId) {
        let bin = &mut self.bins[bin_id.index()];
        for blk_id in bin.contained_blocks.drain() {
            self.block_bin[blk_id.index()] = None;
        }
    }

    /// Verifies that the bin contents and the block-to-bin map agree.
    pub fn verify(&self) -> bool {
        for (i, bin) in self.bins.iter().enumerate() {
            if bin.id.index() != i {
                return false;
            }
            for blk_id in &bin.contained_blocks {
                if self.block_bin[blk_id.index()] != Some(bin.id) {
                    return false;
                }
            }
        }
        for (blk_idx, maybe_bin) in self.block_bin.iter().enumerate() {
            if let Some(bin_id) = maybe_bin {
                let blk_id = BlockId::from_raw(blk_idx as u32);
                if !self.bins[bin_id.index()].contained_blocks.contains(&blk_id) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::MoleculeId;
    use strata_common::Point;

    fn unit_region(x: f64, y: f64) -> Rect {
        Rect::new(Point::new(x, y), Point::new(x + 1.0, y + 1.0))
    }

    fn netlist_with_blocks(n: u32) -> ApNetlist {
        let mut nl = ApNetlist::new("test");
        for i in 0..n {
            nl.create_block(format!("b{i}"), MoleculeId::from_raw(i));
        }
        nl
    }

    #[test]
    fn create_bins_dense_ids() {
        let nl = netlist_with_blocks(0);
        let mut bins = PlacementBins::new(&nl);
        let b0 = bins.create_bin(unit_region(0.0, 0.0));
        let b1 = bins.create_bin(unit_region(1.0, 0.0));
        assert_eq!(b0.index(), 0);
        assert_eq!(b1.index(), 1);
        assert_eq!(bins.bin_count(), 2);
        assert_eq!(bins.bin_region(b1).xmin, 1.0);
    }

    #[test]
    fn add_and_remove_block() {
        let nl = netlist_with_blocks(2);
        let mut bins = PlacementBins::new(&nl);
        let bin = bins.create_bin(unit_region(0.0, 0.0));
        let blk = BlockId::from_raw(0);

        assert_eq!(bins.block_bin(blk), None);
        bins.add_block_to_bin(blk, bin);
        assert_eq!(bins.block_bin(blk), Some(bin));
        assert!(bins.bin_contained_blocks(bin).contains(&blk));
        assert!(bins.verify());

        bins.remove_block_from_bin(blk, bin);
        assert_eq!(bins.block_bin(blk), None);
        assert!(bins.bin_contained_blocks(bin).is_empty());
        assert!(bins.verify());
    }

    #[test]
    fn remove_all_blocks() {
        let nl = netlist_with_blocks(3);
        let mut bins = PlacementBins::new(&nl);
        let bin = bins.create_bin(unit_region(0.0, 0.0));
        for i in 0..3 {
            bins.add_block_to_bin(BlockId::from_raw(i), bin);
        }
        assert_eq!(bins.bin_contained_blocks(bin).len(), 3);
        bins.remove_all_blocks_from_bin(bin);
        assert!(bins.bin_contained_blocks(bin).is_empty());
        for i in 0..3 {
            assert_eq!(bins.block_bin(BlockId::from_raw(i)), None);
        }
        assert!(bins.verify());
    }

    #[test]
    fn verify_catches_inconsistency() {
        let nl = netlist_with_blocks(1);
        let mut bins = PlacementBins::new(&nl);
        let bin = bins.create_bin(unit_region(0.0, 0.0));
        let blk = BlockId::from_raw(0);
        bins.add_block_to_bin(blk, bin);
        // Corrupt the back map behind the container's back.
        bins.block_bin[0] = None;
        assert!(!bins.verify());
    }
}
