//! Common traits defining the collaborator interfaces of the planner

use crate::common::types::*;

/// Collision and bounds oracle for the planning space
pub trait CollisionOracle {
    /// Whether the state is inside the bounds and collision-free
    fn clear(&self, state: &State) -> bool;

    /// Whether the straight-line link between two states is collision-free
    fn link(&self, from: &State, to: &State) -> bool;

    /// Per-dimension (min, max) bounds of the state space
    fn bounds(&self) -> (State, State);
}

/// Result of a successful shooting solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShootingSolution {
    /// Signed duration; negative when integrated backwards in time
    pub dt: f64,
    /// Piecewise-constant control, each knot held for half of `dt`
    pub controls: [Control; 2],
}

/// Numerical two-point-boundary solver for arbitrary dynamics.
///
/// Used for connections between states that were not produced by the
/// closed-form bang-bang steering, i.e. cross-tree links and rewiring.
pub trait ShootingSolver {
    /// Find a control/duration pair that drives `x1` to `x2`.
    ///
    /// When `forward` is false the solution integrates backwards in time.
    fn solve(&self, dynamics: Dynamics, x1: &State, x2: &State, forward: bool)
        -> Option<ShootingSolution>;
}

/// Trait for visualizable algorithms
pub trait Visualizable {
    /// Draw current state to visualizer
    fn visualize(&self, vis: &mut crate::utils::Visualizer);
}
