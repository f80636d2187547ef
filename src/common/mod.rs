//! Common types, traits, and error definitions for kinodynamic_rrt
//!
//! This module provides the foundational building blocks used across
//! the planner: state aliases, paths, collaborator traits and errors.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
