//! The primitive model library.
//!
//! A model is a leaf cell type described by the architecture (a LUT, a
//! flip-flop, a RAM slice, an I/O pad). Every model receives a dense
//! [`ModelId`] at registration; the raw index of that ID is the model's
//! dimension in primitive-vector space, fixed once the library is built.

use crate::ids::ModelId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A primitive model (leaf cell type) in the architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// The unique name of the model (e.g., ".names", ".latch", "io").
    pub name: String,
}

/// The library of all primitive models in the architecture.
///
/// Models are registered once during architecture construction and are
/// immutable afterwards. IDs are handed out densely in registration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelLibrary {
    models: Vec<Model>,
    #[serde(skip)]
    by_name: HashMap<String, ModelId>,
}

impl ModelLibrary {
    /// Creates an empty model library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model and returns its dense ID.
    ///
    /// Registering a name that already exists returns the existing ID.
    pub fn add_model(&mut self, name: impl Into<String>) -> ModelId {
        let name = name.into();
        if let Some(&id) = self.by_name.get(&name) {
            return id;
        }
        let id = ModelId::from_raw(self.models.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.models.push(Model { name });
        id
    }

    /// Returns the number of models, i.e. the dimensionality M of
    /// primitive-vector space.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if no models have been registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Returns the model with the given ID.
    pub fn model(&self, id: ModelId) -> &Model {
        &self.models[id.index()]
    }

    /// Returns the name of the model with the given ID.
    pub fn model_name(&self, id: ModelId) -> &str {
        &self.models[id.index()].name
    }

    /// Looks up a model by name.
    pub fn find(&self, name: &str) -> Option<ModelId> {
        self.by_name.get(name).copied()
    }

    /// Returns an iterator over all model IDs in registration order.
    pub fn ids(&self) -> impl Iterator<Item = ModelId> + '_ {
        (0..self.models.len()).map(|i| ModelId::from_raw(i as u32))
    }

    /// Rebuilds the name lookup after deserialization.
    pub fn rebuild_index(&mut self) {
        self.by_name.clear();
        for (i, model) in self.models.iter().enumerate() {
            self.by_name
                .insert(model.name.clone(), ModelId::from_raw(i as u32));
        }
    }
}
