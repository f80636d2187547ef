//! kinodynamic_rrt - bang-bang kinodynamic RRT* in Rust
//!
//! This crate plans time-optimal motion for a point mass with bounded
//! acceleration on two independent axes, growing a pair of RRT* trees
//! with closed-form bang-bang steering.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod path_planning;

// Re-export common types for convenience
pub use common::{Control, Dynamics, Path, State};
pub use common::{CollisionOracle, ShootingSolution, ShootingSolver, Visualizable};
pub use common::{PlannerError, PlannerResult};
