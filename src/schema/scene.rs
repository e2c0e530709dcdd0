use serde::{Deserialize, Serialize};

/// Handle to a loaded microgame scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneId(pub u64);

/// Handle to an object living in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

/// A loaded microgame scene: its handle and the objects it spawned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub objects: Vec<ObjectId>,
}

impl Scene {
    pub fn new(id: SceneId, objects: impl IntoIterator<Item = ObjectId>) -> Self {
        Self {
            id,
            objects: objects.into_iter().collect(),
        }
    }
}
