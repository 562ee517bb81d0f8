//! Opaque ID newtypes for architecture entities.
//!
//! Each ID is a thin `u32` wrapper that is `Copy`, `Hash`, and
//! `Serialize`/`Deserialize`. These IDs reference primitive models, logical
//! block types, and physical tile types within a device description.

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
    /// Opaque, copyable ID for a primitive model (leaf cell type).
    ///
    /// Model IDs are dense: the raw index doubles as the model's dimension in
    /// primitive-vector space.
    ModelId
);

define_id!(
    /// Opaque, copyable ID for a logical (complex) block type.
    LogicalBlockTypeId
);

define_id!(
    /// Opaque, copyable ID for a physical tile type on the device grid.
    TileTypeId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn id_roundtrip() {
        let id = ModelId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(id.index(), 42);
    }

    #[test]
    fn id_equality() {
        let a = TileTypeId::from_raw(3);
        let b = TileTypeId::from_raw(3);
        let c = TileTypeId::from_raw(4);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn id_hash_in_set() {
        let mut set = HashSet::new();
        set.insert(LogicalBlockTypeId::from_raw(1));
        set.insert(LogicalBlockTypeId::from_raw(2));
        set.insert(LogicalBlockTypeId::from_raw(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn id_display() {
        let id = ModelId::from_raw(7);
        assert_eq!(format!("{id}"), "7");
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = TileTypeId::from_raw(55);
        let json = serde_json::to_string(&id).unwrap();
        let restored: TileTypeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }
}
