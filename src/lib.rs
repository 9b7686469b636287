//! Formation Engine Library
//!
//! Coordinates groups of mobile agents as tactical formations: pattern
//! slot generation, per-member steering, membership bookkeeping and
//! automatic cleanup of formations whose agents die or disappear.
//!
//! The host simulation owns its agents and drives `FormationRegistry::tick`
//! on its own schedule; see `formation-sim` for a tokio-driven example.

pub mod config;
pub mod formation;
pub mod sim;
pub mod util;
