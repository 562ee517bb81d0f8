//! The human-readable mass report.
//!
//! Enumerates the architecture from the mass calculator's point of view: the
//! pb/mode tree of every logical block type, the sub-tile tree of every
//! physical tile, the computed capacity vectors, and how much of the device
//! the netlist's mass is expected to use. The report is advisory output for
//! humans tuning an architecture; nothing downstream parses it.

use crate::error::ApResult;
use crate::mass::MassCalculator;
use crate::netlist::ApNetlist;
use crate::primitive_vector::PrimitiveVector;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use strata_arch::{
    Architecture, DeviceGrid, LogicalBlockTypeId, Mode, ModelId, PbContent, PbType, TileLoc,
    TileTypeId,
};

/// The default file name for the mass report.
pub const DEFAULT_MASS_REPORT_FILE: &str = "ap_mass.rpt";

/// A node in a printing tree. Trees are rendered with box-drawing glyphs.
struct PrintingTreeNode {
    name: String,
    children: Vec<PrintingTreeNode>,
}

/// Renders a node and its subtree, `prefix` being what the children print
/// before their connector glyphs.
fn print_tree_node(
    node: &PrintingTreeNode,
    out: &mut dyn Write,
    prefix: &str,
) -> std::io::Result<()> {
    writeln!(out, "{}", node.name)?;
    let num_children = node.children.len();
    for (child_idx, child) in node.children.iter().enumerate() {
        if child_idx != num_children - 1 {
            write!(out, "{prefix}├── ")?;
            print_tree_node(child, out, &format!("{prefix}│   "))?;
        } else {
            write!(out, "{prefix}└── ")?;
            print_tree_node(child, out, &format!("{prefix}    "))?;
        }
    }
    Ok(())
}

fn gen_mode_tree_node(mode: &Mode, arch: &Architecture) -> PrintingTreeNode {
    PrintingTreeNode {
        name: format!("{} (mode)", mode.name),
        children: mode
            .children
            .iter()
            .map(|pb| gen_pb_tree_node(pb, arch))
            .collect(),
    }
}

fn gen_pb_tree_node(pb_type: &PbType, arch: &Architecture) -> PrintingTreeNode {
    match &pb_type.content {
        PbContent::Leaf { model } => PrintingTreeNode {
            name: format!(
                "{} [{}] (primitive pb_type | model: {})",
                pb_type.name,
                pb_type.num_pb,
                arch.models.model_name(*model)
            ),
            children: Vec::new(),
        },
        PbContent::Modes(modes) => PrintingTreeNode {
            name: format!("{} [{}] (pb_type)", pb_type.name, pb_type.num_pb),
            children: modes
                .iter()
                .map(|mode| gen_mode_tree_node(mode, arch))
                .collect(),
        },
    }
}

fn print_section_header(out: &mut dyn Write, title: &str) -> std::io::Result<()> {
    writeln!(out, "=================================================================")?;
    writeln!(out, "{title}:")?;
    writeln!(out, "=================================================================")?;
    writeln!(out)
}

fn print_logical_block_graph(out: &mut dyn Write, arch: &Architecture) -> std::io::Result<()> {
    print_section_header(out, "Logical (Complex) Block Graph")?;
    for block_type in &arch.logical_block_types {
        let root = PrintingTreeNode {
            name: format!("{} (root logical block)", block_type.name),
            children: block_type
                .pb_type
                .iter()
                .map(|pb| gen_pb_tree_node(pb, arch))
                .collect(),
        };
        print_tree_node(&root, out, "")?;
        writeln!(out)?;
    }
    Ok(())
}

fn print_physical_tile_graph(out: &mut dyn Write, arch: &Architecture) -> std::io::Result<()> {
    print_section_header(out, "Physical Tile Graph")?;
    for tile_type in &arch.physical_tile_types {
        let root = PrintingTreeNode {
            name: format!("{} (tile)", tile_type.name),
            children: tile_type
                .sub_tiles
                .iter()
                .map(|sub_tile| PrintingTreeNode {
                    name: format!("{} [{}] (sub-tile)", sub_tile.name, sub_tile.capacity),
                    children: sub_tile
                        .equivalent_sites
                        .iter()
                        .map(|&site| PrintingTreeNode {
                            name: format!(
                                "{} (equiv-site)",
                                arch.logical_block_type(site).name
                            ),
                            children: Vec::new(),
                        })
                        .collect(),
                })
                .collect(),
        };
        print_tree_node(&root, out, "")?;
        writeln!(out)?;
    }
    Ok(())
}

/// Prints the non-zero dimensions of a primitive vector, one model per line,
/// names right-aligned.
fn print_primitive_vector(
    out: &mut dyn Write,
    vec: &PrimitiveVector,
    arch: &Architecture,
    prefix: &str,
) -> std::io::Result<()> {
    let dims = vec.non_zero_dims();
    let max_name_len = dims
        .iter()
        .map(|&d| arch.models.model_name(ModelId::from_raw(d as u32)).len())
        .max()
        .unwrap_or(0);
    for dim in dims {
        let name = arch.models.model_name(ModelId::from_raw(dim as u32));
        writeln!(out, "{prefix}{name:>max_name_len$}: {}", vec.get(dim))?;
    }
    Ok(())
}

fn print_capacities(
    out: &mut dyn Write,
    mass_calculator: &MassCalculator,
    arch: &Architecture,
) -> std::io::Result<()> {
    print_section_header(out, "Logical Block Type Capacities")?;
    for (idx, block_type) in arch.logical_block_types.iter().enumerate() {
        writeln!(out, "{}:", block_type.name)?;
        let cap = mass_calculator
            .logical_block_type_capacity(LogicalBlockTypeId::from_raw(idx as u32));
        print_primitive_vector(out, cap, arch, "\t")?;
        writeln!(out)?;
    }
    print_section_header(out, "Physical Tile Type Capacities")?;
    for (idx, tile_type) in arch.physical_tile_types.iter().enumerate() {
        writeln!(out, "{}:", tile_type.name)?;
        let cap = mass_calculator.physical_tile_type_capacity(TileTypeId::from_raw(idx as u32));
        print_primitive_vector(out, cap, arch, "\t")?;
        writeln!(out)?;
    }
    Ok(())
}

/// The total capacity of every root tile on the grid.
fn calc_total_grid_capacity(
    mass_calculator: &MassCalculator,
    grid: &DeviceGrid,
) -> PrimitiveVector {
    let mut total = PrimitiveVector::new();
    for layer in 0..grid.num_layers() {
        for x in 0..grid.width() {
            for y in 0..grid.height() {
                let loc = TileLoc::new(x as i32, y as i32, layer as i32);
                if !grid.is_root(loc) {
                    continue;
                }
                total += mass_calculator.physical_tile_type_capacity(grid.tile_type_at(loc));
            }
        }
    }
    total
}

fn calc_total_netlist_mass(
    mass_calculator: &MassCalculator,
    ap_netlist: &ApNetlist,
) -> PrimitiveVector {
    let mut total = PrimitiveVector::new();
    for blk_id in ap_netlist.blocks() {
        total += mass_calculator.block_mass(blk_id);
    }
    total
}

fn print_netlist_mass_utilization(
    out: &mut dyn Write,
    ap_netlist: &ApNetlist,
    mass_calculator: &MassCalculator,
    arch: &Architecture,
    grid: &DeviceGrid,
) -> std::io::Result<()> {
    print_section_header(out, "Netlist Mass Utilization")?;
    let total_grid_capacity = calc_total_grid_capacity(mass_calculator, grid);
    let total_netlist_mass = calc_total_netlist_mass(mass_calculator, ap_netlist);

    // How many blocks touch each model at all.
    let mut per_model_block_counts = PrimitiveVector::new();
    for blk_id in ap_netlist.blocks() {
        for dim in mass_calculator.block_mass(blk_id).non_zero_dims() {
            per_model_block_counts.add_to_dim(dim, 1.0);
        }
    }

    let max_name_len = arch
        .models
        .ids()
        .map(|id| arch.models.model_name(id).len())
        .max()
        .unwrap_or(0)
        .max("Model".len());

    writeln!(
        out,
        "{:>max_name_len$}: Total Netlist Mass | Total Grid Mass | Mass Utilization",
        "Model"
    )?;
    for model_id in arch.models.ids() {
        let netlist_mass = total_netlist_mass.get(model_id.index());
        let grid_mass = total_grid_capacity.get(model_id.index());
        let utilization = if grid_mass > 0.0 {
            netlist_mass / grid_mass
        } else {
            0.0
        };
        writeln!(
            out,
            "{:>max_name_len$}: {netlist_mass:18} | {grid_mass:15} | {utilization:16.4}",
            arch.models.model_name(model_id)
        )?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "{:>max_name_len$}: Total Netlist Mass | Number of Blocks | Average Mass per Block",
        "Model"
    )?;
    for model_id in arch.models.ids() {
        let netlist_mass = total_netlist_mass.get(model_id.index());
        let num_blocks = per_model_block_counts.get(model_id.index());
        let average = if num_blocks > 0.0 {
            netlist_mass / num_blocks
        } else {
            0.0
        };
        writeln!(
            out,
            "{:>max_name_len$}: {netlist_mass:18} | {num_blocks:16} | {average:22.4}",
            arch.models.model_name(model_id)
        )?;
    }
    writeln!(out)
}

fn print_expected_device_utilization(
    out: &mut dyn Write,
    ap_netlist: &ApNetlist,
    mass_calculator: &MassCalculator,
    arch: &Architecture,
    grid: &DeviceGrid,
) -> std::io::Result<()> {
    print_section_header(out, "Expected Device Utilization")?;
    let total_netlist_mass = calc_total_netlist_mass(mass_calculator, ap_netlist);

    // The expected number of instances of a logical block type is driven by
    // whichever of its models the netlist needs the most of.
    let mut num_type_instances = vec![0u64; arch.logical_block_types.len()];
    for (idx, _) in arch.logical_block_types.iter().enumerate() {
        let block_type_cap =
            mass_calculator.logical_block_type_capacity(LogicalBlockTypeId::from_raw(idx as u32));
        let mut needed = 0u64;
        for dim in block_type_cap.non_zero_dims() {
            let netlist_model_mass = total_netlist_mass.get(dim);
            let mass_per_block = block_type_cap.get(dim);
            needed = needed.max((netlist_model_mass / mass_per_block).ceil() as u64);
        }
        num_type_instances[idx] = needed;
    }

    let max_name_len = arch
        .logical_block_types
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(0);

    writeln!(out, "Expected number of logical blocks:")?;
    for (idx, block_type) in arch.logical_block_types.iter().enumerate() {
        if block_type.is_empty() {
            continue;
        }
        writeln!(
            out,
            "\t{:>max_name_len$}: {}",
            block_type.name, num_type_instances[idx]
        )?;
    }
    writeln!(out)?;

    // Sites available for each logical block type across the whole grid.
    let mut num_sites = vec![0u64; arch.logical_block_types.len()];
    for layer in 0..grid.num_layers() {
        for x in 0..grid.width() {
            for y in 0..grid.height() {
                let loc = TileLoc::new(x as i32, y as i32, layer as i32);
                if !grid.is_root(loc) {
                    continue;
                }
                let tile = arch.tile_type(grid.tile_type_at(loc));
                for sub_tile in &tile.sub_tiles {
                    for &site in &sub_tile.equivalent_sites {
                        num_sites[site.index()] += u64::from(sub_tile.capacity);
                    }
                }
            }
        }
    }

    writeln!(out, "Expected block utilization:")?;
    for (idx, block_type) in arch.logical_block_types.iter().enumerate() {
        if block_type.is_empty() {
            continue;
        }
        let utilization = if num_sites[idx] > 0 {
            num_type_instances[idx] as f64 / num_sites[idx] as f64
        } else {
            0.0
        };
        writeln!(
            out,
            "\t{:>max_name_len$}: {utilization:.4}",
            block_type.name
        )?;
    }
    writeln!(out)
}

/// Writes the mass report to the given path.
pub fn generate_mass_report(
    path: &Path,
    ap_netlist: &ApNetlist,
    mass_calculator: &MassCalculator,
    arch: &Architecture,
    grid: &DeviceGrid,
) -> ApResult<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    print_logical_block_graph(&mut out, arch)?;
    print_physical_tile_graph(&mut out, arch)?;
    print_capacities(&mut out, mass_calculator, arch)?;
    print_netlist_mass_utilization(&mut out, ap_netlist, mass_calculator, arch, grid)?;
    print_expected_device_utilization(&mut out, ap_netlist, mass_calculator, arch, grid)?;
    out.flush()?;
    Ok(())
}
