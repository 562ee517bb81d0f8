//! Logical block types and their pb/mode trees.
//!
//! A logical (complex) block type is described by a tree of physical blocks
//! (pbs). A pb is either a primitive leaf implementing a single model, or it
//! has one or more modes, each of which contains child pbs. A pb can operate
//! in only one mode at a time, but the mode choice is free per instance.

use crate::ids::ModelId;
use serde::{Deserialize, Serialize};

/// The content of a pb type: either a primitive leaf or a set of modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PbContent {
    /// A primitive pb implementing one model.
    Leaf {
        /// The model this primitive implements.
        model: ModelId,
    },
    /// A non-primitive pb with one or more operating modes.
    Modes(Vec<Mode>),
}

/// A physical block (pb) type within a logical block's tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PbType {
    /// The name of this pb type.
    pub name: String,
    /// How many instances of this pb its parent mode contains.
    pub num_pb: u32,
    /// The leaf model or the modes of this pb.
    pub content: PbContent,
}

impl PbType {
    /// Creates a primitive leaf pb implementing the given model.
    pub fn leaf(name: impl Into<String>, num_pb: u32, model: ModelId) -> Self {
        Self {
            name: name.into(),
            num_pb,
            content: PbContent::Leaf { model },
        }
    }

    /// Creates a non-primitive pb with the given modes.
    pub fn with_modes(name: impl Into<String>, num_pb: u32, modes: Vec<Mode>) -> Self {
        Self {
            name: name.into(),
            num_pb,
            content: PbContent::Modes(modes),
        }
    }

    /// Returns `true` if this pb is a primitive leaf.
    pub fn is_primitive(&self) -> bool {
        matches!(self.content, PbContent::Leaf { .. })
    }
}

/// One operating mode of a pb type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mode {
    /// The name of the mode.
    pub name: String,
    /// The child pbs instantiated when this mode is active.
    pub children: Vec<PbType>,
}

impl Mode {
    /// Creates a mode with the given children.
    pub fn new(name: impl Into<String>, children: Vec<PbType>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }
}

/// A logical (complex) block type in the architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalBlockType {
    /// The name of this logical block type (e.g., "clb", "io").
    pub name: String,
    /// The root of the pb tree, or `None` for the empty block type.
    pub pb_type: Option<PbType>,
}

impl LogicalBlockType {
    /// Creates a logical block type with the given root pb.
    pub fn new(name: impl Into<String>, pb_type: PbType) -> Self {
        Self {
            name: name.into(),
            pb_type: Some(pb_type),
        }
    }

    /// Creates the empty logical block type, which contains no primitives.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pb_type: None,
        }
    }

    /// Returns `true` if this block type contains no primitives.
    pub fn is_empty(&self) -> bool {
        self.pb_type.is_none()
    }
}
