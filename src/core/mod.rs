//! Runtime core: clocks, viewport targets, sessions and the director.

pub mod clock;
pub mod collaborators;
pub mod director;
pub mod partition;
pub mod player;
pub mod recorder;
pub mod session;
pub mod viewport;
