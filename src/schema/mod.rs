//! Plain data: player slots, scenes and microgame definitions.

pub mod microgame;
pub mod player;
pub mod scene;
