//! The SimPL-style global placement driver.
//!
//! Each iteration, the analytical solver produces a lower-bound placement
//! (minimal wirelength, heavily overlapping) and the partial legalizer
//! spreads it into an upper-bound placement (mostly legal, worse wirelength).
//! The legalized placement is fed back to the solver as its anchor hint, so
//! over the iterations the two bounds approach each other; the driver stops
//! once they are within a relative gap, or at the iteration cap.

use crate::density::DensityManager;
use crate::error::ApResult;
use crate::legalizer::{make_partial_legalizer, PartialLegalizer, PartialLegalizerKind};
use crate::netlist::ApNetlist;
use crate::placement::PartialPlacement;
use crate::solver::{make_analytical_solver, AnalyticalSolver, AnalyticalSolverKind};
use std::time::Instant;
use strata_diagnostics::{DiagnosticSink, Stage};

/// The maximum number of solve/legalize iterations.
const MAX_NUM_ITERATIONS: usize = 100;

/// The driver stops once `(ub - lb) / ub` drops below this gap. Found
/// empirically to give a good quality/runtime trade-off.
const TARGET_HPWL_RELATIVE_GAP: f64 = 0.05;

/// A global placer: produces a mostly-legal partial placement for a netlist
/// on a device.
pub trait GlobalPlacer {
    /// Runs global placement and returns the resulting placement.
    fn place(&mut self, netlist: &ApNetlist, sink: &DiagnosticSink) -> ApResult<PartialPlacement>;
}

fn print_status_header() {
    println!("----  ----------------  ----------------  -----------  --------------  ----------");
    println!("Iter  Lower Bound HPWL  Upper Bound HPWL  Solver Time  Legalizer Time  Total Time");
    println!("                                                (sec)           (sec)       (sec)");
    println!("----  ----------------  ----------------  -----------  --------------  ----------");
}

fn print_status(
    iteration: usize,
    lb_hpwl: f64,
    ub_hpwl: f64,
    solver_time: f64,
    legalizer_time: f64,
    total_time: f64,
) {
    println!(
        "{iteration:4}  {lb_hpwl:16.2}  {ub_hpwl:16.2}  {solver_time:11.3}  {legalizer_time:14.3}  {total_time:10.3}"
    );
}

/// The SimPL driver: strict alternation of one solver and one legalizer,
/// both chosen at construction.
pub struct SimPlGlobalPlacer {
    solver: Box<dyn AnalyticalSolver>,
    legalizer: Box<dyn PartialLegalizer>,
}

impl SimPlGlobalPlacer {
    /// Builds the solver and legalizer for the given netlist and density
    /// state. `num_models` is the dimensionality of primitive-vector space.
    pub fn new(
        solver_kind: AnalyticalSolverKind,
        legalizer_kind: PartialLegalizerKind,
        netlist: &ApNetlist,
        density_manager: DensityManager,
        num_models: usize,
    ) -> Self {
        Self {
            solver: make_analytical_solver(solver_kind, netlist),
            legalizer: make_partial_legalizer(legalizer_kind, density_manager, num_models),
        }
    }
}

impl GlobalPlacer for SimPlGlobalPlacer {
    fn place(&mut self, netlist: &ApNetlist, sink: &DiagnosticSink) -> ApResult<PartialPlacement> {
        let runtime = Instant::now();
        print_status_header();
        let mut placement = PartialPlacement::new(netlist);
        for iteration in 0..MAX_NUM_ITERATIONS {
            let iter_start_time = runtime.elapsed().as_secs_f64();

            // Lower bound: the solver's minimal-wirelength placement.
            let solver_start_time = runtime.elapsed().as_secs_f64();
            self.solver.solve(iteration, &mut placement)?;
            let solver_end_time = runtime.elapsed().as_secs_f64();
            let lb_hpwl = placement.hpwl(netlist);

            // Upper bound: the spread placement, which becomes the next
            // iteration's anchor hint.
            let legalizer_start_time = runtime.elapsed().as_secs_f64();
            self.legalizer.legalize(netlist, &mut placement, sink)?;
            let legalizer_end_time = runtime.elapsed().as_secs_f64();
            let ub_hpwl = placement.hpwl(netlist);

            let iter_end_time = runtime.elapsed().as_secs_f64();
            print_status(
                iteration,
                lb_hpwl,
                ub_hpwl,
                solver_end_time - solver_start_time,
                legalizer_end_time - legalizer_start_time,
                iter_end_time - iter_start_time,
            );

            let hpwl_relative_gap = (ub_hpwl - lb_hpwl) / ub_hpwl;
            if hpwl_relative_gap < TARGET_HPWL_RELATIVE_GAP {
                break;
            }
        }
        // The legalizer warns when it gives up with bins still overfilled;
        // surface how often that happened across the whole run.
        let spreading_warnings = sink.stage_count(Stage::PartialLegalizer);
        if spreading_warnings > 0 {
            println!(
                "Global placer finished with {spreading_warnings} spreading warnings; \
                 the placement may still be overfilled."
            );
        }
        Ok(placement)
    }
}
