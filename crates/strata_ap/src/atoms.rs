//! Read-only contracts of the collaborators feeding the AP core.
//!
//! The atom netlist and the prepacker are produced upstream of analytical
//! placement. The core only ever reads them: it needs the model of each atom
//! (to compute masses) and the atoms grouped into each molecule (to compute
//! block masses). The optional flat-placement hint carries positions from a
//! previous run.

use crate::ids::{AtomBlockId, MoleculeId};
use serde::{Deserialize, Serialize};
use strata_arch::ModelId;

/// A single atom (primitive instance) in the user design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    /// The instance name of the atom.
    pub name: String,
    /// The model this atom is an instance of.
    pub model: ModelId,
}

/// The frozen atom netlist, as seen by the AP core.
///
/// Only the queries the core needs are exposed; connectivity lives in the AP
/// netlist instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtomNetlist {
    atoms: Vec<Atom>,
}

impl AtomNetlist {
    /// Creates an empty atom netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an atom and returns its ID.
    pub fn add_atom(&mut self, name: impl Into<String>, model: ModelId) -> AtomBlockId {
        let id = AtomBlockId::from_raw(self.atoms.len() as u32);
        self.atoms.push(Atom {
            name: name.into(),
            model,
        });
        id
    }

    /// Returns an iterator over all atom IDs in insertion order.
    pub fn blocks(&self) -> impl Iterator<Item = AtomBlockId> + '_ {
        (0..self.atoms.len()).map(|i| AtomBlockId::from_raw(i as u32))
    }

    /// Returns the model of the given atom.
    pub fn block_model(&self, id: AtomBlockId) -> ModelId {
        self.atoms[id.index()].model
    }

    /// Returns the name of the given atom.
    pub fn block_name(&self, id: AtomBlockId) -> &str {
        &self.atoms[id.index()].name
    }

    /// Returns the number of atoms.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Returns `true` if the netlist contains no atoms.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

/// A prepacked molecule: an indivisible group of atoms that must be placed
/// together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Molecule {
    /// The atoms in this molecule.
    ///
    /// Slots may be `None`: pack patterns reserve positions that a given
    /// molecule does not fill.
    // TODO: The prepacker leaves unfilled pattern positions as None; drop
    //       them at molecule build time so consumers stop having to skip them.
    pub atoms: Vec<Option<AtomBlockId>>,
}

/// The frozen output of the prepacker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prepacker {
    molecules: Vec<Molecule>,
}

impl Prepacker {
    /// Creates an empty prepacker result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a molecule and returns its ID.
    pub fn add_molecule(&mut self, atoms: Vec<Option<AtomBlockId>>) -> MoleculeId {
        let id = MoleculeId::from_raw(self.molecules.len() as u32);
        self.molecules.push(Molecule { atoms });
        id
    }

    /// Returns the molecule with the given ID.
    pub fn molecule(&self, id: MoleculeId) -> &Molecule {
        &self.molecules[id.index()]
    }

    /// Returns the number of molecules.
    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    /// Returns `true` if no molecules have been created.
    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }
}

/// Per-atom placement hints loaded from a previous run.
///
/// Components holding the sentinel values are undefined. Fixed-block
/// verification applies a (0.5, 0.5) centring offset when a valid hint is
/// present, since hint files store tile anchor positions rather than tile
/// centres.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatPlacementInfo {
    /// The x-position of each atom. [`Self::UNDEFINED_POS`] if undefined.
    pub blk_x_pos: Vec<f64>,
    /// The y-position of each atom. [`Self::UNDEFINED_POS`] if undefined.
    pub blk_y_pos: Vec<f64>,
    /// The layer of each atom. [`Self::UNDEFINED_LAYER`] if undefined.
    pub blk_layer: Vec<i32>,
    /// The sub-tile of each atom. [`Self::UNDEFINED_SUB_TILE`] if undefined.
    pub blk_sub_tile: Vec<i32>,
    /// `true` when a hint has actually been loaded into this object.
    pub valid: bool,
}

impl FlatPlacementInfo {
    /// Sentinel for an undefined position.
    pub const UNDEFINED_POS: f64 = -1.0;
    /// Sentinel for an undefined layer.
    pub const UNDEFINED_LAYER: i32 = -1;
    /// Sentinel for an undefined sub-tile.
    pub const UNDEFINED_SUB_TILE: i32 = -1;

    /// Creates an empty, invalid hint (no previous run available).
    pub fn none() -> Self {
        Self {
            blk_x_pos: Vec::new(),
            blk_y_pos: Vec::new(),
            blk_layer: Vec::new(),
            blk_sub_tile: Vec::new(),
            valid: false,
        }
    }

    /// Creates a valid hint with undefined positions for every atom in the
    /// given netlist.
    pub fn for_netlist(atom_netlist: &AtomNetlist) -> Self {
        let n = atom_netlist.len();
        Self {
            blk_x_pos: vec![Self::UNDEFINED_POS; n],
            blk_y_pos: vec![Self::UNDEFINED_POS; n],
            blk_layer: vec![Self::UNDEFINED_LAYER; n],
            blk_sub_tile: vec![Self::UNDEFINED_SUB_TILE; n],
            valid: true,
        }
    }
}

impl Default for FlatPlacementInfo {
    fn default() -> Self {
        Self::none()
    }
}
