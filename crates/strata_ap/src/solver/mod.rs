//! Analytical solvers for the global placement flow.
//!
//! A solver updates the moveable-block coordinates of a partial placement to
//! minimize an analytic wirelength objective. Solvers are interchangeable
//! behind the [`AnalyticalSolver`] trait and are chosen once, at
//! construction, through [`make_analytical_solver`].

mod matrix;
mod qp_hybrid;

pub use matrix::{conjugate_gradient, CgFailure, CsrMatrix, TripletList};
pub use qp_hybrid::QpHybridSolver;

use crate::error::ApResult;
use crate::netlist::ApNetlist;
use crate::placement::PartialPlacement;

/// The closed set of analytical solvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticalSolverKind {
    /// Quadratic objective with a hybrid clique/star net model.
    QpHybrid,
}

/// An analytical solver minimizing a wirelength objective.
pub trait AnalyticalSolver {
    /// Updates the moveable-block coordinates of `placement`.
    ///
    /// On iteration 0 the pure objective is minimized; on later iterations
    /// the placement passed in also acts as the anchor hint that pulls
    /// moveable blocks toward the last legalized solution.
    fn solve(&mut self, iteration: usize, placement: &mut PartialPlacement) -> ApResult<()>;
}

/// Builds a solver of the given kind for the given netlist.
///
/// The linear system is assembled here, once; solving per iteration only
/// copies and perturbs it.
pub fn make_analytical_solver(
    kind: AnalyticalSolverKind,
    netlist: &ApNetlist,
) -> Box<dyn AnalyticalSolver> {
    match kind {
        AnalyticalSolverKind::QpHybrid => Box::new(QpHybridSolver::new(netlist)),
    }
}
