//! Pre-computation of tile capacities and block masses.
//!
//! Capacities and masses live in primitive-vector space: one dimension per
//! model in the architecture. The capacity of a logical block type comes from
//! recursing its pb/mode tree; the capacity of a physical tile from its
//! sub-tiles; the mass of an AP block from the atoms inside its molecule.
//! All three tables are computed once at construction and read-only
//! thereafter.

use crate::atoms::{AtomNetlist, Prepacker};
use crate::error::{ApError, ApResult};
use crate::ids::BlockId;
use crate::netlist::ApNetlist;
use crate::primitive_vector::PrimitiveVector;
use strata_arch::{
    Architecture, LogicalBlockType, LogicalBlockTypeId, Mode, ModelId, PbContent, PbType,
    PhysicalTileType, SubTile, TileTypeId,
};

/// The scalar mass of one instance of the given model.
///
/// A model with a higher mass takes up more space in its bin, forcing more
/// spreading of that primitive type. Uniform for now; this is the single
/// injection point for heuristic weighting.
fn model_mass(_model: ModelId) -> f64 {
    1.0
}

/// How many primitives of each model the given mode can contain.
///
/// One half of a double recursion: a mode contains pbs, which themselves have
/// modes.
fn calc_mode_capacity(mode: &Mode) -> PrimitiveVector {
    let mut capacity = PrimitiveVector::new();
    for child in &mode.children {
        let mut child_capacity = calc_pb_type_capacity(child);
        // A mode may contain multiple pbs of the same type.
        child_capacity *= f64::from(child.num_pb);
        capacity += &child_capacity;
    }
    capacity
}

/// How many primitives of each model the given pb can contain.
///
/// A pb can only operate in one mode at a time, so mode capacities are not
/// accumulated; the elementwise max gives an upper bound over whichever mode
/// gets chosen.
fn calc_pb_type_capacity(pb_type: &PbType) -> PrimitiveVector {
    let mut capacity = PrimitiveVector::new();
    match &pb_type.content {
        PbContent::Leaf { model } => {
            capacity.add_to_dim(model.index(), model_mass(*model));
        }
        PbContent::Modes(modes) => {
            for mode in modes {
                let mode_capacity = calc_mode_capacity(mode);
                capacity = PrimitiveVector::max(&capacity, &mode_capacity);
            }
        }
    }
    capacity
}

/// The capacity of a logical block type: the capacity of its root pb, or the
/// zero vector for the empty type.
fn calc_logical_block_type_capacity(block_type: &LogicalBlockType) -> PrimitiveVector {
    match &block_type.pb_type {
        Some(pb_type) => calc_pb_type_capacity(pb_type),
        None => PrimitiveVector::new(),
    }
}

/// The capacity of one sub-tile.
///
/// A sub-tile site can host any one of its equivalent logical block types,
/// so the capacities are mixed with an elementwise max, then multiplied by
/// the number of sites.
fn calc_sub_tile_capacity(
    sub_tile: &SubTile,
    logical_block_type_capacities: &[PrimitiveVector],
) -> PrimitiveVector {
    let mut capacity = PrimitiveVector::new();
    for site in &sub_tile.equivalent_sites {
        let block_capacity = &logical_block_type_capacities[site.index()];
        capacity = PrimitiveVector::max(&capacity, block_capacity);
    }
    capacity *= f64::from(sub_tile.capacity);
    capacity
}

/// The capacity of a physical tile type: the sum of its sub-tile capacities.
fn calc_physical_tile_type_capacity(
    tile_type: &PhysicalTileType,
    logical_block_type_capacities: &[PrimitiveVector],
) -> PrimitiveVector {
    let mut capacity = PrimitiveVector::new();
    for sub_tile in &tile_type.sub_tiles {
        let sub_tile_capacity = calc_sub_tile_capacity(sub_tile, logical_block_type_capacities);
        capacity += &sub_tile_capacity;
    }
    capacity
}

/// Pre-computed capacity and mass tables shared read-only across the flow.
#[derive(Debug)]
pub struct MassCalculator {
    logical_block_type_capacities: Vec<PrimitiveVector>,
    physical_tile_type_capacities: Vec<PrimitiveVector>,
    block_masses: Vec<PrimitiveVector>,
}

impl MassCalculator {
    /// Computes the capacity of every logical block type and physical tile
    /// type in the architecture, and the mass of every block in the netlist.
    ///
    /// Fails if an atom references a model outside the architecture's model
    /// library.
    pub fn new(
        ap_netlist: &ApNetlist,
        prepacker: &Prepacker,
        atom_netlist: &AtomNetlist,
        arch: &Architecture,
    ) -> ApResult<Self> {
        let logical_block_type_capacities: Vec<PrimitiveVector> = arch
            .logical_block_types
            .iter()
            .map(calc_logical_block_type_capacity)
            .collect();

        let physical_tile_type_capacities: Vec<PrimitiveVector> = arch
            .physical_tile_types
            .iter()
            .map(|t| calc_physical_tile_type_capacity(t, &logical_block_type_capacities))
            .collect();

        let num_models = arch.models.len();
        let mut block_masses = Vec::with_capacity(ap_netlist.block_count());
        for blk_id in ap_netlist.blocks() {
            let mol_id = ap_netlist.block_molecule(blk_id);
            let molecule = prepacker.molecule(mol_id);
            let mut mass = PrimitiveVector::new();
            for slot in &molecule.atoms {
                // Unfilled pattern positions are skipped.
                let Some(atom_id) = slot else {
                    continue;
                };
                let model = atom_netlist.block_model(*atom_id);
                if model.index() >= num_models {
                    return Err(ApError::MalformedArchitecture {
                        atom: atom_netlist.block_name(*atom_id).to_string(),
                        model_index: model.index(),
                        num_models,
                    });
                }
                mass.add_to_dim(model.index(), model_mass(model));
            }
            block_masses.push(mass);
        }

        Ok(Self {
            logical_block_type_capacities,
            physical_tile_type_capacities,
            block_masses,
        })
    }

    /// Returns the capacity of the given logical block type.
    pub fn logical_block_type_capacity(&self, id: LogicalBlockTypeId) -> &PrimitiveVector {
        &self.logical_block_type_capacities[id.index()]
    }

    /// Returns the capacity of the given physical tile type.
    pub fn physical_tile_type_capacity(&self, id: TileTypeId) -> &PrimitiveVector {
        &self.physical_tile_type_capacities[id.index()]
    }

    /// Returns the mass of the given AP block.
    pub fn block_mass(&self, id: BlockId) -> &PrimitiveVector {
        &self.block_masses[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_arch::ModelLibrary;

    /// A clb-like architecture: two models, a logical block whose root pb has
    /// two modes (4 LUTs, or 2 LUTs + 2 FFs), and a unit tile with two clb
    /// sites.
    fn make_arch() -> (Architecture, ModelId, ModelId) {
        let mut models = ModelLibrary::new();
        let lut = models.add_model("lut4");
        let ff = models.add_model("dff");

        let lut_mode = Mode::new("all_luts", vec![PbType::leaf("lut4", 4, lut)]);
        let mixed_mode = Mode::new(
            "lut_ff",
            vec![PbType::leaf("lut4", 2, lut), PbType::leaf("dff", 2, ff)],
        );
        let clb = LogicalBlockType::new(
            "clb",
            PbType::with_modes("clb_root", 1, vec![lut_mode, mixed_mode]),
        );

        let tile = PhysicalTileType::unit(
            "clb_tile",
            vec![SubTile::new("clb_sub", 2, vec![LogicalBlockTypeId::from_raw(0)])],
        );

        let arch = Architecture {
            models,
            logical_block_types: vec![clb],
            physical_tile_types: vec![tile],
        };
        (arch, lut, ff)
    }

    #[test]
    fn logical_block_capacity_takes_max_across_modes() {
        let (arch, lut, ff) = make_arch();
        let nl = ApNetlist::new("empty");
        let calc =
            MassCalculator::new(&nl, &Prepacker::new(), &AtomNetlist::new(), &arch).unwrap();
        let cap = calc.logical_block_type_capacity(LogicalBlockTypeId::from_raw(0));
        // Mode 1 gives <4 luts, 0 ffs>; mode 2 gives <2 luts, 2 ffs>. The
        // elementwise max is <4, 2>.
        assert_eq!(cap.get(lut.index()), 4.0);
        assert_eq!(cap.get(ff.index()), 2.0);
    }

    #[test]
    fn tile_capacity_scales_by_sub_tile_capacity() {
        let (arch, lut, ff) = make_arch();
        let nl = ApNetlist::new("empty");
        let calc =
            MassCalculator::new(&nl, &Prepacker::new(), &AtomNetlist::new(), &arch).unwrap();
        let cap = calc.physical_tile_type_capacity(TileTypeId::from_raw(0));
        // Two clb sites per tile.
        assert_eq!(cap.get(lut.index()), 8.0);
        assert_eq!(cap.get(ff.index()), 4.0);
    }

    #[test]
    fn empty_logical_block_has_zero_capacity() {
        let (mut arch, _, _) = make_arch();
        arch.logical_block_types.push(LogicalBlockType::empty("EMPTY"));
        let nl = ApNetlist::new("empty");
        let calc =
            MassCalculator::new(&nl, &Prepacker::new(), &AtomNetlist::new(), &arch).unwrap();
        assert!(calc
            .logical_block_type_capacity(LogicalBlockTypeId::from_raw(1))
            .is_zero());
    }

    #[test]
    fn block_mass_sums_molecule_atoms() {
        let (arch, lut, ff) = make_arch();
        let mut atoms = AtomNetlist::new();
        let a0 = atoms.add_atom("lut_0", lut);
        let a1 = atoms.add_atom("lut_1", lut);
        let a2 = atoms.add_atom("ff_0", ff);
        let mut prepacker = Prepacker::new();
        let mol = prepacker.add_molecule(vec![Some(a0), Some(a1), Some(a2)]);
        let mut nl = ApNetlist::new("test");
        let blk = nl.create_block("b0", mol);

        let calc = MassCalculator::new(&nl, &prepacker, &atoms, &arch).unwrap();
        let mass = calc.block_mass(blk);
        assert_eq!(mass.get(lut.index()), 2.0);
        assert_eq!(mass.get(ff.index()), 1.0);
    }

    #[test]
    fn block_mass_skips_empty_molecule_slots() {
        let (arch, lut, _) = make_arch();
        let mut atoms = AtomNetlist::new();
        let a0 = atoms.add_atom("lut_0", lut);
        let mut prepacker = Prepacker::new();
        let mol = prepacker.add_molecule(vec![Some(a0), None, None]);
        let mut nl = ApNetlist::new("test");
        let blk = nl.create_block("b0", mol);

        let calc = MassCalculator::new(&nl, &prepacker, &atoms, &arch).unwrap();
        assert_eq!(calc.block_mass(blk).get(lut.index()), 1.0);
        assert_eq!(calc.block_mass(blk).manhattan_norm(), 1.0);
    }

    #[test]
    fn out_of_range_model_is_fatal() {
        let (arch, _, _) = make_arch();
        let mut atoms = AtomNetlist::new();
        // Model index 9 does not exist in the two-model library.
        let a0 = atoms.add_atom("mystery", ModelId::from_raw(9));
        let mut prepacker = Prepacker::new();
        let mol = prepacker.add_molecule(vec![Some(a0)]);
        let mut nl = ApNetlist::new("test");
        nl.create_block("b0", mol);

        let err = MassCalculator::new(&nl, &prepacker, &atoms, &arch).unwrap_err();
        match err {
            ApError::MalformedArchitecture {
                atom, model_index, ..
            } => {
                assert_eq!(atom, "mystery");
                assert_eq!(model_index, 9);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
