//! I-GA placement engine: maps VM resource demands onto candidate hosts,
//! minimizing a joint energy/availability fitness under a virtual-capacity
//! overcommit model (VHAM).

pub mod engine;
pub mod vham;

pub use engine::{PlacementEngine, PlacementError};
