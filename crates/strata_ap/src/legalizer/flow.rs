//! The multi-commodity flow-based spreading legalizer.
//!
//! Blocks are binned by the density manager; overfilled bins then push blocks
//! along paths toward underfilled bins. Each iteration raises the maximum
//! displacement cost a move may incur, so blocks flow the smallest distance
//! that resolves the congestion. The technique follows Darav et al.
//! (<https://doi.org/10.1145/3289602.3293896>), generalized to arbitrary
//! architectures: bins are connected to the closest bin in each cardinal
//! direction for every primitive type, so any block type can always flow
//! somewhere.

use crate::density::DensityManager;
use crate::error::{ApError, ApResult};
use crate::ids::{BinId, BlockId};
use crate::legalizer::PartialLegalizer;
use crate::netlist::{ApNetlist, BlockMobility};
use crate::placement::PartialPlacement;
use crate::primitive_vector::PrimitiveVector;
use std::collections::{HashSet, VecDeque};
use strata_diagnostics::{Diagnostic, DiagnosticSink, Stage};

/// The maximum number of spreading iterations. Prevents the legalizer from
/// spinning forever when there is not enough space to flow blocks into.
const MAX_NUM_ITERATIONS: usize = 100;

/// The maximum number of hops between a bin and its neighbors, in bins.
/// Bounds the per-bin BFS when the neighbor graph is built.
const MAX_BIN_NEIGHBOR_DIST: u32 = 4;

/// The maximum per-edge move cost allowed in the given iteration. Grows
/// quadratically so early iterations only make short, cheap moves.
fn compute_max_movement(iteration: usize) -> f64 {
    (100 * (iteration + 1) * (iteration + 1)) as f64
}

/// The bins sharing an edge with the given bin's region, on the bin's own
/// layer. Corners do not count.
fn direct_neighbors_of_bin(bin_id: BinId, density_manager: &DensityManager) -> HashSet<BinId> {
    let region = *density_manager.placement_bins().bin_region(bin_id);
    let layer = density_manager.bin_layer(bin_id) as f64;
    let bl_x = region.xmin as i64;
    let bl_y = region.ymin as i64;
    let bin_width = region.width() as i64;
    let bin_height = region.height() as i64;
    let (grid_width, grid_height, _) = density_manager.placeable_region_size();

    let mut neighbors = HashSet::new();
    // Unique tiles on the left and right sides.
    for ty in bl_y..bl_y + bin_height {
        if bl_x >= 1 {
            neighbors.insert(density_manager.get_bin((bl_x - 1) as f64, ty as f64, layer));
        }
        if bl_x + bin_width <= grid_width as i64 - 1 {
            neighbors.insert(density_manager.get_bin((bl_x + bin_width) as f64, ty as f64, layer));
        }
    }
    // Unique tiles above and below.
    for tx in bl_x..bl_x + bin_width {
        if bl_y >= 1 {
            neighbors.insert(density_manager.get_bin(tx as f64, (bl_y - 1) as f64, layer));
        }
        if bl_y + bin_height <= grid_height as i64 - 1 {
            neighbors.insert(density_manager.get_bin(tx as f64, (bl_y + bin_height) as f64, layer));
        }
    }
    debug_assert!(!neighbors.contains(&bin_id));
    neighbors
}

/// Finds the moveable block in `src_bin` that is cheapest to move into
/// `target_bin`, along with its cost.
///
/// Cost is the squared displacement from the block's current position to the
/// closest point inside the target bin. Blocks whose mass does not fit the
/// target's capacity (projected onto the mass) are incompatible and skipped.
fn min_cost_block_in_bin(
    density_manager: &DensityManager,
    src_bin: BinId,
    target_bin: BinId,
    placement: &PartialPlacement,
    netlist: &ApNetlist,
) -> Option<(BlockId, f64)> {
    let bins = density_manager.placement_bins();
    let target_region = bins.bin_region(target_bin);
    let mut best: Option<(BlockId, f64)> = None;
    for &blk_id in bins.bin_contained_blocks(src_bin) {
        // Fixed blocks have infinite cost to move.
        if netlist.block_mobility(blk_id) == BlockMobility::Fixed {
            continue;
        }
        let block_mass = density_manager.mass_calculator().block_mass(blk_id);
        let mut target_capacity = density_manager.bin_capacity(target_bin).clone();
        target_capacity.project(block_mass);
        if target_capacity.any_dim_lt(block_mass) {
            continue;
        }
        let new_pos = density_manager.block_location_in_bin(blk_id, target_region, placement);
        let dx = new_pos.x - placement.block_x_locs[blk_id.index()];
        let dy = new_pos.y - placement.block_y_locs[blk_id.index()];
        let cost = dx * dx + dy * dy;
        if best.map_or(true, |(_, best_cost)| cost < best_cost) {
            best = Some((blk_id, cost));
        }
    }
    best
}

/// The cost of moving a block from `src_bin` into `target_bin`, or `None`
/// when no compatible block exists or the cheapest one exceeds `psi`.
///
/// The quadratic movement is weighted by how much of the source bin's
/// utilization shares the block's primitive types, which biases moves toward
/// block types the bin holds many of.
fn compute_cost(
    density_manager: &DensityManager,
    src_bin: BinId,
    target_bin: BinId,
    psi: f64,
    placement: &PartialPlacement,
    netlist: &ApNetlist,
) -> Option<f64> {
    if density_manager
        .placement_bins()
        .bin_contained_blocks(src_bin)
        .is_empty()
    {
        return None;
    }
    let (min_cost_block, min_cost) =
        min_cost_block_in_bin(density_manager, src_bin, target_bin, placement, netlist)?;
    if min_cost >= psi {
        return None;
    }
    let block_mass = density_manager.mass_calculator().block_mass(min_cost_block);
    let mut weight_vec = density_manager.bin_utilization(src_bin).clone();
    weight_vec.project(block_mass);
    Some(weight_vec.manhattan_norm() * min_cost)
}

/// Flow-based spreading over the density manager's bins.
pub struct FlowBasedLegalizer {
    density_manager: DensityManager,
    /// For each bin, the closest bins in each cardinal direction for every
    /// primitive type. Computed once at construction.
    bin_neighbors: Vec<Vec<BinId>>,
}

impl FlowBasedLegalizer {
    /// Builds the legalizer and the bin neighbor graph.
    pub fn new(density_manager: DensityManager, num_models: usize) -> Self {
        let num_bins = density_manager.placement_bins().bin_count();
        let mut bin_neighbors = Vec::with_capacity(num_bins);
        for bin_idx in 0..num_bins {
            let bin_id = BinId::from_raw(bin_idx as u32);
            bin_neighbors.push(compute_neighbors_of_bin(
                &density_manager,
                bin_id,
                num_models,
            ));
        }
        Self {
            density_manager,
            bin_neighbors,
        }
    }

    /// Returns the density manager.
    pub fn density_manager(&self) -> &DensityManager {
        &self.density_manager
    }

    /// Supply is how over-capacity a bin is.
    fn bin_supply(&self, bin_id: BinId) -> &PrimitiveVector {
        self.density_manager.bin_overfill(bin_id)
    }

    /// Demand is how under-capacity a bin is.
    fn bin_demand(&self, bin_id: BinId) -> &PrimitiveVector {
        self.density_manager.bin_underfill(bin_id)
    }

    /// Checks the density state and the neighbor graph for consistency.
    fn verify(&self, netlist: &ApNetlist) -> bool {
        if !self.density_manager.verify(netlist) {
            return false;
        }
        // A bin with no neighbors can never flow its blocks anywhere. An
        // empty netlist projects every capacity to zero, so the graph is
        // legitimately empty there.
        if netlist.block_count() > 0 {
            for neighbors in &self.bin_neighbors {
                if neighbors.is_empty() {
                    return false;
                }
            }
        }
        true
    }

    /// Finds paths from `src_bin` along which blocks can flow at a per-edge
    /// cost below `psi`, until the discovered demand covers the source's
    /// supply. Paths are returned sorted by ascending tail cost.
    fn get_paths(
        &self,
        src_bin: BinId,
        placement: &PartialPlacement,
        netlist: &ApNetlist,
        psi: f64,
    ) -> Vec<Vec<BinId>> {
        let density_manager = &self.density_manager;
        let num_bins = density_manager.placement_bins().bin_count();
        let mut bin_visited = vec![false; num_bins];
        bin_visited[src_bin.index()] = true;
        // The cost of a path is the cost of its tail bin.
        let mut bin_cost = vec![0.0f64; num_bins];
        let mut queue: VecDeque<Vec<BinId>> = VecDeque::new();
        queue.push_back(vec![src_bin]);
        let mut paths: Vec<Vec<BinId>> = Vec::new();

        // Search until the accumulated demand of the path tails can absorb
        // the source bin's entire supply.
        let starting_bin_supply = self.bin_supply(src_bin).clone();
        let mut demand = PrimitiveVector::new();
        while demand.any_dim_lt(&starting_bin_supply) {
            let Some(path) = queue.pop_front() else {
                break;
            };
            let tail_bin = *path.last().expect("paths are never empty");
            for &neighbor_bin in &self.bin_neighbors[tail_bin.index()] {
                if bin_visited[neighbor_bin.index()] {
                    continue;
                }
                let Some(cost) = compute_cost(
                    density_manager,
                    tail_bin,
                    neighbor_bin,
                    psi,
                    placement,
                    netlist,
                ) else {
                    continue;
                };
                let mut extended_path = path.clone();
                bin_cost[neighbor_bin.index()] = bin_cost[tail_bin.index()] + cost;
                extended_path.push(neighbor_bin);
                bin_visited[neighbor_bin.index()] = true;
                // If the neighbor has demand for the source's supply it
                // terminates a path; otherwise blocks can only flow through.
                let mut neighbor_demand = self.bin_demand(neighbor_bin).clone();
                neighbor_demand.project(&starting_bin_supply);
                if neighbor_demand.is_non_zero() {
                    paths.push(extended_path);
                    demand += &neighbor_demand;
                } else {
                    queue.push_back(extended_path);
                }
            }
        }

        paths.sort_by(|a, b| {
            let ca = bin_cost[a.last().expect("paths are never empty").index()];
            let cb = bin_cost[b.last().expect("paths are never empty").index()];
            ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
        });
        paths
    }

    /// Flows one block along the path in a conga line, tail first: the last
    /// edge moves a block into the tail bin, freeing room for the edge before
    /// it, and so on back to the source.
    fn flow_blocks_along_path(
        &mut self,
        path: &[BinId],
        placement: &PartialPlacement,
        netlist: &ApNetlist,
        psi: f64,
    ) {
        debug_assert!(!path.is_empty());
        // A previous flow on another path may have made this path infeasible;
        // re-verify every edge before committing to it.
        let mut src_bin = path[0];
        for &sink_bin in &path[1..] {
            if compute_cost(
                &self.density_manager,
                src_bin,
                sink_bin,
                psi,
                placement,
                netlist,
            )
            .is_none()
            {
                return;
            }
            src_bin = sink_bin;
        }
        for j in (1..path.len()).rev() {
            let from_bin = path[j - 1];
            let to_bin = path[j];
            let Some((blk_id, _)) =
                min_cost_block_in_bin(&self.density_manager, from_bin, to_bin, placement, netlist)
            else {
                return;
            };
            self.density_manager.remove_block(blk_id, from_bin);
            self.density_manager.insert_block(blk_id, to_bin);
        }
    }
}

/// Computes the neighbors of a bin: a BFS (bounded by
/// [`MAX_BIN_NEIGHBOR_DIST`]) that finds, for each of the four cardinal
/// directions, the closest bin with capacity for every primitive type.
///
/// Every bin must be reachable from every block type in several directions,
/// otherwise a bin holding a block type none of its neighbors can accept
/// would never converge.
fn compute_neighbors_of_bin(
    density_manager: &DensityManager,
    src_bin_id: BinId,
    num_models: usize,
) -> Vec<BinId> {
    let num_bins = density_manager.placement_bins().bin_count();
    let mut queue = VecDeque::new();
    queue.push_back(src_bin_id);
    let mut bin_visited = vec![false; num_bins];
    bin_visited[src_bin_id.index()] = true;
    let mut bin_distance = vec![0u32; num_bins];

    // Per-direction flags for whether each model has found a home yet.
    let mut up_found = vec![false; num_models];
    let mut down_found = vec![false; num_models];
    let mut left_found = vec![false; num_models];
    let mut right_found = vec![false; num_models];
    let mut all_up_found = false;
    let mut all_down_found = false;
    let mut all_left_found = false;
    let mut all_right_found = false;

    let src_center = density_manager
        .placement_bins()
        .bin_region(src_bin_id)
        .center();
    let mut neighbors: HashSet<BinId> = HashSet::new();

    // Adds the target as a neighbor for any model it newly supplies in this
    // direction; reports whether the direction is now fully covered.
    let add_neighbor_if_new_dir =
        |target_bin_id: BinId, dir_found: &mut [bool], neighbors: &mut HashSet<BinId>| {
            let mut all_found = true;
            for model_idx in 0..num_models {
                if dir_found[model_idx] {
                    continue;
                }
                let target_bin_capacity = density_manager.bin_capacity(target_bin_id);
                if target_bin_capacity.get(model_idx) > 0.0 {
                    dir_found[model_idx] = true;
                    neighbors.insert(target_bin_id);
                } else {
                    all_found = false;
                }
            }
            all_found
        };

    while let Some(bin_id) = queue.pop_front() {
        if all_up_found && all_down_found && all_left_found && all_right_found {
            break;
        }
        let curr_bin_dist = bin_distance[bin_id.index()];
        if curr_bin_dist > MAX_BIN_NEIGHBOR_DIST {
            continue;
        }
        for dir_neighbor_bin_id in direct_neighbors_of_bin(bin_id, density_manager) {
            if bin_visited[dir_neighbor_bin_id.index()] {
                continue;
            }
            // Classify the neighbor by the dominant component of its offset
            // from the source bin's center.
            let target_center = density_manager
                .placement_bins()
                .bin_region(dir_neighbor_bin_id)
                .center();
            let dx = target_center.x - src_center.x;
            let dy = target_center.y - src_center.y;
            if !all_up_found && dy >= dx.abs() {
                all_up_found =
                    add_neighbor_if_new_dir(dir_neighbor_bin_id, &mut up_found, &mut neighbors);
            }
            if !all_down_found && dy <= -dx.abs() {
                all_down_found =
                    add_neighbor_if_new_dir(dir_neighbor_bin_id, &mut down_found, &mut neighbors);
            }
            if !all_right_found && dx >= dy.abs() {
                all_right_found =
                    add_neighbor_if_new_dir(dir_neighbor_bin_id, &mut right_found, &mut neighbors);
            }
            if !all_left_found && dx <= -dy.abs() {
                all_left_found =
                    add_neighbor_if_new_dir(dir_neighbor_bin_id, &mut left_found, &mut neighbors);
            }
            bin_visited[dir_neighbor_bin_id.index()] = true;
            bin_distance[dir_neighbor_bin_id.index()] = curr_bin_dist + 1;
            queue.push_back(dir_neighbor_bin_id);
        }
    }

    neighbors.into_iter().collect()
}

impl PartialLegalizer for FlowBasedLegalizer {
    fn legalize(
        &mut self,
        netlist: &ApNetlist,
        placement: &mut PartialPlacement,
        sink: &DiagnosticSink,
    ) -> ApResult<()> {
        // Rebin the incoming placement from scratch.
        self.density_manager.import_placement(placement);
        debug_assert!(self.density_manager.verify(netlist));

        let mut iteration = 0;
        loop {
            if iteration >= MAX_NUM_ITERATIONS {
                let remaining = self.density_manager.overfilled_bins().len();
                if remaining > 0 {
                    sink.emit(Diagnostic::warning(
                        Stage::PartialLegalizer,
                        format!(
                            "hit the iteration limit with {remaining} bins still overfilled; \
                             continuing with the current spread"
                        ),
                    ));
                }
                break;
            }
            if self.density_manager.overfilled_bins().is_empty() {
                break;
            }
            let psi = compute_max_movement(iteration);

            // Spread the least-overfilled bins first. The L1 norm is used
            // since only the total overfill matters, not its distribution
            // across dimensions.
            let mut overfilled_bins: Vec<BinId> = self
                .density_manager
                .overfilled_bins()
                .iter()
                .copied()
                .collect();
            overfilled_bins.sort_by(|&a, &b| {
                let na = self.bin_supply(a).manhattan_norm();
                let nb = self.bin_supply(b).manhattan_norm();
                na.partial_cmp(&nb).unwrap_or(std::cmp::Ordering::Equal)
            });

            for src_bin_id in overfilled_bins {
                // Earlier flows this iteration may already have drained it.
                if !self.density_manager.bin_is_overfilled(src_bin_id) {
                    continue;
                }
                let paths = self.get_paths(src_bin_id, placement, netlist, psi);
                for path in &paths {
                    if !self.density_manager.bin_is_overfilled(src_bin_id) {
                        break;
                    }
                    // Only the bin assignments change here; block positions
                    // follow on export.
                    self.flow_blocks_along_path(path, placement, netlist, psi);
                }
            }
            iteration += 1;
        }

        if !self.verify(netlist) {
            return Err(ApError::PlacementVerifyFailed(
                "density state inconsistent after flow-based spreading".to_string(),
            ));
        }
        self.density_manager.export_placement(netlist, placement);
        Ok(())
    }
}
