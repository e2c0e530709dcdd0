//! Object-to-layer assignments for a microgame scene.

use rustc_hash::FxHashMap;

use crate::schema::player::Layer;
use crate::schema::scene::ObjectId;

#[derive(Debug, Clone, Default)]
pub struct PartitionTable {
    layers: FxHashMap<ObjectId, Layer>,
}

impl PartitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `object` on `layer`, replacing any earlier assignment.
    pub fn assign(&mut self, object: ObjectId, layer: Layer) {
        self.layers.insert(object, layer);
    }

    pub fn assign_all(&mut self, objects: impl IntoIterator<Item = ObjectId>, layer: Layer) {
        for object in objects {
            self.assign(object, layer);
        }
    }

    pub fn layer_of(&self, object: ObjectId) -> Option<Layer> {
        self.layers.get(&object).copied()
    }

    /// Objects visible to a camera whose culling mask is `layer.mask()`,
    /// sorted by id.
    pub fn objects_on(&self, layer: Layer) -> Vec<ObjectId> {
        let mut objects: Vec<ObjectId> = self
            .layers
            .iter()
            .filter(|(_, l)| **l == layer)
            .map(|(o, _)| *o)
            .collect();
        objects.sort();
        objects
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
