//! Analytical placement core for the Strata FPGA toolchain.
//!
//! This crate takes an unclustered netlist of prepacked blocks (the
//! [`ApNetlist`]) together with a device description (from `strata_arch`) and
//! produces a continuous-space [`PartialPlacement`] of the blocks on the
//! device grid. The core alternates two engines until their solutions agree:
//!
//! 1. **Solve**: a quadratic-objective analytical solver places connected
//!    blocks close together, ignoring overlap (the lower bound).
//! 2. **Spread**: a density-aware partial legalizer flows blocks between
//!    spatial bins until no bin exceeds its capacity (the upper bound).
//!
//! The resulting placement is mostly legal: blocks sit on the device, fixed
//! blocks respect their constraints, and density approaches device capacity.
//! Binding blocks to concrete sub-tiles and producing a routable placement is
//! the job of downstream legalization.
//!
//! # Usage
//!
//! ```ignore
//! use strata_ap::place;
//!
//! let placement = place(
//!     &ap_netlist,
//!     &prepacker,
//!     &atom_netlist,
//!     &flat_placement_hint,
//!     &arch,
//!     &grid,
//!     &target_densities,
//!     Some(Path::new("ap_mass.rpt")),
//!     &sink,
//! )?;
//! ```

#![warn(missing_docs)]

pub mod atoms;
pub mod bins;
pub mod density;
pub mod error;
pub mod global;
pub mod ids;
pub mod legalizer;
pub mod mass;
pub mod mass_report;
pub mod netlist;
pub mod placement;
pub mod primitive_vector;
pub mod solver;

pub use atoms::{AtomNetlist, FlatPlacementInfo, Molecule, Prepacker};
pub use density::DensityManager;
pub use error::{ApError, ApResult};
pub use global::{GlobalPlacer, SimPlGlobalPlacer};
pub use ids::{AtomBlockId, BinId, BlockId, MoleculeId, NetId, PinId, PortId};
pub use legalizer::{make_partial_legalizer, PartialLegalizer, PartialLegalizerKind};
pub use mass::MassCalculator;
pub use mass_report::{generate_mass_report, DEFAULT_MASS_REPORT_FILE};
pub use netlist::{ApNetlist, BlockMobility, FixedBlockLoc, PinKind, PortDirection};
pub use placement::PartialPlacement;
pub use primitive_vector::PrimitiveVector;
pub use solver::{make_analytical_solver, AnalyticalSolver, AnalyticalSolverKind};

use std::path::Path;
use strata_arch::{Architecture, DeviceGrid};
use strata_diagnostics::{Diagnostic, DiagnosticSink, Stage};

/// Emits a summary of the AP netlist as a note diagnostic.
fn emit_netlist_stats(netlist: &ApNetlist, sink: &DiagnosticSink) {
    let mut num_moveable = 0usize;
    let mut num_fixed = 0usize;
    for blk_id in netlist.blocks() {
        match netlist.block_mobility(blk_id) {
            BlockMobility::Moveable => num_moveable += 1,
            BlockMobility::Fixed => num_fixed += 1,
        }
    }
    let mut highest_fanout = 0usize;
    let mut total_fanout = 0usize;
    for net_id in netlist.nets() {
        let fanout = netlist.net_pins(net_id).len();
        highest_fanout = highest_fanout.max(fanout);
        total_fanout += fanout;
    }
    let average_fanout = if netlist.net_count() > 0 {
        total_fanout as f64 / netlist.net_count() as f64
    } else {
        0.0
    };
    sink.emit(Diagnostic::note(
        Stage::GlobalPlacer,
        format!(
            "netlist '{}': {} blocks ({} moveable, {} fixed), {} nets (average fanout {:.2}, highest {}), {} pins",
            netlist.name,
            netlist.block_count(),
            num_moveable,
            num_fixed,
            netlist.net_count(),
            average_fanout,
            highest_fanout,
            netlist.pin_count()
        ),
    ));
}

/// Runs the analytical placement core end to end.
///
/// Computes masses and capacities, optionally writes the mass report, builds
/// the density manager, and drives the solve/spread loop. The returned
/// placement has been verified against the device dimensions and the fixed
/// block constraints.
///
/// All collaborators are passed explicitly and borrowed read-only;
/// `flat_placement` is the optional hint from a previous run (pass
/// [`FlatPlacementInfo::none`] when there is none).
#[allow(clippy::too_many_arguments)]
pub fn place(
    ap_netlist: &ApNetlist,
    prepacker: &Prepacker,
    atom_netlist: &AtomNetlist,
    flat_placement: &FlatPlacementInfo,
    arch: &Architecture,
    grid: &DeviceGrid,
    target_density_arg_strs: &[String],
    mass_report_path: Option<&Path>,
    sink: &DiagnosticSink,
) -> ApResult<PartialPlacement> {
    emit_netlist_stats(ap_netlist, sink);

    let mass_calculator = MassCalculator::new(ap_netlist, prepacker, atom_netlist, arch)?;
    if let Some(path) = mass_report_path {
        generate_mass_report(path, ap_netlist, &mass_calculator, arch, grid)?;
    }

    let density_manager = DensityManager::new(
        ap_netlist,
        atom_netlist,
        mass_calculator,
        arch,
        grid,
        target_density_arg_strs,
        sink,
    )?;

    let mut placer = SimPlGlobalPlacer::new(
        AnalyticalSolverKind::QpHybrid,
        PartialLegalizerKind::FlowBased,
        ap_netlist,
        density_manager,
        arch.models.len(),
    );
    let placement = placer.place(ap_netlist, sink)?;

    if !placement.verify(
        ap_netlist,
        grid.width(),
        grid.height(),
        grid.num_layers(),
        flat_placement,
    ) {
        return Err(ApError::PlacementVerifyFailed(
            "global placement result violates device bounds or fixed block constraints"
                .to_string(),
        ));
    }
    Ok(placement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_arch::{
        LogicalBlockType, LogicalBlockTypeId, ModelLibrary, PbType, PhysicalTileType, SubTile,
        TileTypeId,
    };

    struct World {
        netlist: ApNetlist,
        atoms: AtomNetlist,
        prepacker: Prepacker,
        arch: Architecture,
        grid: DeviceGrid,
    }

    /// One model, unit tiles of the given site capacity, on a
    /// `width x height` single-layer grid, with one single-atom block per
    /// requested netlist block.
    fn make_world(num_blocks: u32, tile_capacity: u32, width: usize, height: usize) -> World {
        let mut models = ModelLibrary::new();
        let m0 = models.add_model("m0");
        let lb = LogicalBlockType::new("lb", PbType::leaf("prim", 1, m0));
        let tile = PhysicalTileType::unit(
            "tile0",
            vec![SubTile::new(
                "sub0",
                tile_capacity,
                vec![LogicalBlockTypeId::from_raw(0)],
            )],
        );
        let arch = Architecture {
            models,
            logical_block_types: vec![lb],
            physical_tile_types: vec![tile],
        };
        let grid = DeviceGrid::new(width, height, 1, TileTypeId::from_raw(0));

        let mut atoms = AtomNetlist::new();
        let mut prepacker = Prepacker::new();
        let mut netlist = ApNetlist::new("top");
        for i in 0..num_blocks {
            let atom = atoms.add_atom(format!("atom{i}"), m0);
            let mol = prepacker.add_molecule(vec![Some(atom)]);
            netlist.create_block(format!("b{i}"), mol);
        }
        World {
            netlist,
            atoms,
            prepacker,
            arch,
            grid,
        }
    }

    fn connect(world: &mut World, name: &str, blocks: &[BlockId]) {
        let net = world.netlist.create_net(name);
        for (i, &blk) in blocks.iter().enumerate() {
            let port =
                world
                    .netlist
                    .create_port(blk, format!("{name}_p{i}"), 1, PortDirection::Output);
            world.netlist.create_pin(
                port,
                0,
                net,
                if i == 0 { PinKind::Driver } else { PinKind::Sink },
                false,
            );
        }
    }

    #[test]
    fn full_flow_places_and_verifies() {
        let mut world = make_world(4, 1, 4, 4);
        connect(&mut world, "n0", &[BlockId::from_raw(0), BlockId::from_raw(1)]);
        connect(&mut world, "n1", &[BlockId::from_raw(1), BlockId::from_raw(2)]);
        connect(&mut world, "n2", &[BlockId::from_raw(2), BlockId::from_raw(3)]);

        let sink = DiagnosticSink::new();
        let placement = place(
            &world.netlist,
            &world.prepacker,
            &world.atoms,
            &FlatPlacementInfo::none(),
            &world.arch,
            &world.grid,
            &[],
            None,
            &sink,
        )
        .unwrap();

        assert!(placement.verify(&world.netlist, 4, 4, 1, &FlatPlacementInfo::none()));
        // The stats note and the density note were emitted; no errors.
        assert!(!sink.has_errors());
        let notes = sink.diagnostics();
        assert!(notes.iter().any(|d| d.message.contains("4 blocks")));
        assert!(notes.iter().any(|d| d.message.contains("target densities")));
    }

    #[test]
    fn full_flow_respects_fixed_blocks() {
        let mut world = make_world(2, 1, 4, 4);
        world.netlist.set_block_loc(
            BlockId::from_raw(1),
            FixedBlockLoc {
                x: Some(3),
                y: Some(3),
                layer: Some(0),
                sub_tile: Some(0),
            },
        );
        connect(&mut world, "n0", &[BlockId::from_raw(0), BlockId::from_raw(1)]);

        let sink = DiagnosticSink::new();
        let placement = place(
            &world.netlist,
            &world.prepacker,
            &world.atoms,
            &FlatPlacementInfo::none(),
            &world.arch,
            &world.grid,
            &[],
            None,
            &sink,
        )
        .unwrap();

        assert_eq!(placement.block_x_locs[1], 3.0);
        assert_eq!(placement.block_y_locs[1], 3.0);
        // The moveable block was pulled toward the fixed one but pushed off
        // it by the capacity-one tiles.
        let moveable_tile = (
            placement.block_x_locs[0].floor() as i32,
            placement.block_y_locs[0].floor() as i32,
        );
        assert_ne!(moveable_tile, (3, 3));
    }

    #[test]
    fn full_flow_writes_mass_report_when_asked() {
        let world = make_world(1, 1, 2, 2);
        let path = std::env::temp_dir().join(format!(
            "strata_ap_flow_report_{}.rpt",
            std::process::id()
        ));
        let sink = DiagnosticSink::new();
        place(
            &world.netlist,
            &world.prepacker,
            &world.atoms,
            &FlatPlacementInfo::none(),
            &world.arch,
            &world.grid,
            &[],
            Some(&path),
            &sink,
        )
        .unwrap();
        let report = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(report.contains("Netlist Mass Utilization:"));
    }

    #[test]
    fn full_flow_rejects_bad_density_args() {
        let world = make_world(1, 1, 2, 2);
        let sink = DiagnosticSink::new();
        let err = place(
            &world.netlist,
            &world.prepacker,
            &world.atoms,
            &FlatPlacementInfo::none(),
            &world.arch,
            &world.grid,
            &["tile0:0".to_string()],
            None,
            &sink,
        )
        .unwrap_err();
        assert!(matches!(err, ApError::InvalidTargetDensity { .. }));
    }

    #[test]
    fn empty_netlist_flows_through() {
        let world = make_world(0, 1, 2, 2);
        let sink = DiagnosticSink::new();
        let placement = place(
            &world.netlist,
            &world.prepacker,
            &world.atoms,
            &FlatPlacementInfo::none(),
            &world.arch,
            &world.grid,
            &[],
            None,
            &sink,
        )
        .unwrap();
        assert!(placement.block_x_locs.is_empty());
    }
}
