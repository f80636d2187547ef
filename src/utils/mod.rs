//! Utility modules for kinodynamic_rrt

pub mod visualization;

pub use visualization::{circle_outline, colors, PathStyle, PointStyle, Visualizer};
