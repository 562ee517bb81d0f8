//! The QP-Hybrid analytical solver.
//!
//! Minimizes a quadratic wirelength objective over the moveable blocks using
//! a hybrid net model: small nets become cliques, large nets get a star node
//! as an auxiliary variable. From the second global-placement iteration on,
//! every moveable block is also pulled toward its position in the hint
//! placement by a pseudo-anchor whose strength grows exponentially.
//!
//! The update equations for each connection come from taking the partial
//! derivatives of the quadratic objective with respect to the moveable block
//! locations, as described in the FastPlace paper.

use crate::error::{ApError, ApResult};
use crate::ids::{BlockId, NetId};
use crate::netlist::{ApNetlist, BlockMobility};
use crate::placement::PartialPlacement;
use crate::solver::matrix::{conjugate_gradient, CsrMatrix, TripletList};
use crate::solver::AnalyticalSolver;

/// Nets with more pins than this are modeled with a star node instead of a
/// clique.
const STAR_NUM_PINS_THRESHOLD: usize = 3;

/// Relative-residual tolerance for conjugate gradient.
const CG_TOLERANCE: f64 = 1e-10;

/// The QP-Hybrid solver state: the frozen linear system plus the row
/// mapping for moveable blocks.
pub struct QpHybridSolver {
    /// Number of moveable blocks (rows `[0, n)` of the system).
    num_moveable_blocks: usize,
    /// Row of each moveable block, indexed by block ID.
    blk_id_to_row: Vec<Option<usize>>,
    /// Block of each row in `[0, num_moveable_blocks)`.
    row_to_blk_id: Vec<BlockId>,
    /// The frozen coefficient matrix (moveable rows then star rows).
    a: CsrMatrix,
    /// The constant vector for the x axis.
    b_x: Vec<f64>,
    /// The constant vector for the y axis.
    b_y: Vec<f64>,
}

/// Whether the solver uses this net at all: ignored nets and trivial nets
/// contribute nothing to the objective.
fn solver_uses_net(netlist: &ApNetlist, net_id: NetId) -> bool {
    !netlist.net_is_ignored(net_id) && netlist.net_pins(net_id).len() > 1
}

impl QpHybridSolver {
    /// Assembles the linear system for the given netlist.
    pub fn new(netlist: &ApNetlist) -> Self {
        // Assign a dense row to each moveable block.
        let mut blk_id_to_row = vec![None; netlist.block_count()];
        let mut row_to_blk_id = Vec::new();
        for blk_id in netlist.blocks() {
            if netlist.block_mobility(blk_id) != BlockMobility::Moveable {
                continue;
            }
            blk_id_to_row[blk_id.index()] = Some(row_to_blk_id.len());
            row_to_blk_id.push(blk_id);
        }
        let num_moveable_blocks = row_to_blk_id.len();

        // Star nodes get the rows after the moveable blocks.
        let num_star_nodes = netlist
            .nets()
            .filter(|&net_id| {
                solver_uses_net(netlist, net_id)
                    && netlist.net_pins(net_id).len() > STAR_NUM_PINS_THRESHOLD
            })
            .count();

        let num_variables = num_moveable_blocks + num_star_nodes;
        let mut triplets = TripletList::new(num_variables);
        triplets.reserve(num_moveable_blocks * netlist.net_count().max(1));
        let mut b_x = vec![0.0; num_variables];
        let mut b_y = vec![0.0; num_variables];

        // Store an explicit zero on every diagonal so the per-iteration
        // anchor weights can be added in place after freezing.
        for row in 0..num_variables {
            triplets.add(row, row, 0.0);
        }

        let add_connection = |src_row: usize,
                                  target_blk: BlockId,
                                  weight: f64,
                                  triplets: &mut TripletList,
                                  b_x: &mut [f64],
                                  b_y: &mut [f64]| {
            if netlist.block_mobility(target_blk) == BlockMobility::Moveable {
                let target_row = blk_id_to_row[target_blk.index()]
                    .expect("moveable blocks always have a row");
                triplets.add(src_row, src_row, weight);
                triplets.add(target_row, target_row, weight);
                triplets.add(src_row, target_row, -weight);
                triplets.add(target_row, src_row, -weight);
            } else {
                // A fixed target only strengthens the source's diagonal and
                // pulls it toward the fixed position. Axes the block is not
                // constrained in anchor at the grid origin, matching the
                // block's initial placement.
                let loc = netlist.block_loc(target_blk);
                triplets.add(src_row, src_row, weight);
                b_x[src_row] += weight * f64::from(loc.x.unwrap_or(0));
                b_y[src_row] += weight * f64::from(loc.y.unwrap_or(0));
            }
        };

        let mut star_node_offset = 0;
        for net_id in netlist.nets() {
            if !solver_uses_net(netlist, net_id) {
                continue;
            }
            let pins = netlist.net_pins(net_id);
            let num_pins = pins.len();
            if num_pins > STAR_NUM_PINS_THRESHOLD {
                // Star model: connect every pin's block to an auxiliary star
                // node with the FastPlace weight.
                let w = num_pins as f64 / (num_pins as f64 - 1.0);
                let star_row = num_moveable_blocks + star_node_offset;
                for &pin_id in pins {
                    let blk_id = netlist.pin_block(pin_id);
                    add_connection(star_row, blk_id, w, &mut triplets, &mut b_x, &mut b_y);
                }
                star_node_offset += 1;
            } else {
                // Clique model: connect every unordered pair of blocks with
                // the FastPlace weight.
                let w = 1.0 / (num_pins as f64 - 1.0);
                for i in 0..num_pins {
                    for j in (i + 1)..num_pins {
                        let mut first_blk = netlist.pin_block(pins[i]);
                        let mut second_blk = netlist.pin_block(pins[j]);
                        if netlist.block_mobility(first_blk) == BlockMobility::Fixed {
                            if netlist.block_mobility(second_blk) == BlockMobility::Fixed {
                                // No variables involved, no equation to add.
                                continue;
                            }
                            std::mem::swap(&mut first_blk, &mut second_blk);
                        }
                        let first_row = blk_id_to_row[first_blk.index()]
                            .expect("first block is moveable after the swap");
                        add_connection(
                            first_row, second_blk, w, &mut triplets, &mut b_x, &mut b_y,
                        );
                    }
                }
            }
        }
        debug_assert_eq!(star_node_offset, num_star_nodes);

        Self {
            num_moveable_blocks,
            blk_id_to_row,
            row_to_blk_id,
            a: triplets.to_csr(),
            b_x,
            b_y,
        }
    }

    /// Returns the total number of variables (moveable blocks + star nodes).
    pub fn num_variables(&self) -> usize {
        self.a.n()
    }

    /// Returns the linear-system row of the given block, or `None` for fixed
    /// blocks (which are not variables).
    pub fn moveable_row(&self, blk_id: BlockId) -> Option<usize> {
        self.blk_id_to_row[blk_id.index()]
    }
}

impl AnalyticalSolver for QpHybridSolver {
    fn solve(&mut self, iteration: usize, placement: &mut PartialPlacement) -> ApResult<()> {
        let num_variables = self.a.n();
        if num_variables == 0 {
            return Ok(());
        }

        // Work on copies: the anchors change every iteration but the base
        // system never does.
        let mut a = self.a.clone();
        let mut b_x = self.b_x.clone();
        let mut b_y = self.b_y.clone();

        // On iteration 0 the raw system is solved; afterwards the incoming
        // placement acts as a set of anchor points whose pull grows
        // exponentially with the iteration count.
        if iteration != 0 {
            let coeff_pseudo_anchor = 0.01 * (iteration as f64 / 5.0).exp();
            for row in 0..self.num_moveable_blocks {
                let blk_id = self.row_to_blk_id[row];
                a.add_to_diagonal(row, coeff_pseudo_anchor);
                b_x[row] += coeff_pseudo_anchor * placement.block_x_locs[blk_id.index()];
                b_y[row] += coeff_pseudo_anchor * placement.block_y_locs[blk_id.index()];
            }
        }

        let max_iterations = 2 * num_variables;
        let x = conjugate_gradient(&a, &b_x, CG_TOLERANCE, max_iterations).map_err(|e| {
            ApError::SolverNonConvergence {
                axis: "x",
                residual: e.residual,
                iterations: e.iterations,
            }
        })?;
        let y = conjugate_gradient(&a, &b_y, CG_TOLERANCE, max_iterations).map_err(|e| {
            ApError::SolverNonConvergence {
                axis: "y",
                residual: e.residual,
                iterations: e.iterations,
            }
        })?;

        // Rows [0, num_moveable_blocks) are the moveable blocks; star node
        // rows are auxiliary and discarded.
        for row in 0..self.num_moveable_blocks {
            let blk_id = self.row_to_blk_id[row];
            placement.block_x_locs[blk_id.index()] = x[row];
            placement.block_y_locs[blk_id.index()] = y[row];
        }
        Ok(())
    }
}
