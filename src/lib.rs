//! Microgame Runtime: timed split-screen microgames for party games.
//!
//! Each player roams a shared overworld and drops into short timed
//! microgames. A microgame runs as a [`core::session::Session`] with its own
//! scalable clock and renders into the owning player's off-screen viewport
//! target. Outcomes are routed to feedback and opinion collaborators.

pub mod core;
pub mod schema;
