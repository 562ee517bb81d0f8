//! Opaque ID newtypes for analytical-placement entities.
//!
//! Each ID is a thin `u32` wrapper used as an arena index into the AP netlist
//! or its collaborators. They are `Copy`, `Hash`, and
//! `Serialize`/`Deserialize`.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the raw index as a `usize` for direct array indexing.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a block in the AP netlist.
    BlockId
);

define_id!(
    /// Opaque, copyable ID for a port in the AP netlist.
    PortId
);

define_id!(
    /// Opaque, copyable ID for a pin in the AP netlist.
    PinId
);

define_id!(
    /// Opaque, copyable ID for a net in the AP netlist.
    NetId
);

define_id!(
    /// Opaque, copyable ID for a density bin on the device grid.
    BinId
);

define_id!(
    /// Opaque, copyable ID for an atom in the atom netlist.
    AtomBlockId
);

define_id!(
    /// Opaque, copyable ID for a prepacked molecule.
    MoleculeId
);
