//! Common types used throughout kinodynamic_rrt

use nalgebra::{Vector2, Vector4};

/// Full planner state `(x, xdot, y, ydot)`.
///
/// The two axis pairs are independent under the dynamics.
pub type State = Vector4<f64>;

/// Control input `(ux, uy)`: acceleration along each axis.
pub type Control = Vector2<f64>;

/// Dynamics as a plain function value: `(state, control) -> state derivative`.
pub type Dynamics = fn(&State, &Control) -> State;

/// Index of the position/velocity components of each axis within a [State].
pub const X: usize = 0;
pub const XDOT: usize = 1;
pub const Y: usize = 2;
pub const YDOT: usize = 3;

/// Element-wise equality within `tolerance`.
pub fn states_equal(a: &State, b: &State, tolerance: f64) -> bool {
    a.iter().zip(b.iter()).all(|(p, q)| (p - q).abs() <= tolerance)
}

/// Spatial (x, y) distance between two states, ignoring velocity.
pub fn spatial_distance(a: &State, b: &State) -> f64 {
    ((a[X] - b[X]).powi(2) + (a[Y] - b[Y]).powi(2)).sqrt()
}

/// Path represented as a sequence of states plus its total traversal time
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub states: Vec<State>,
    pub distance: f64,
}

impl Path {
    pub fn new(distance: f64, states: Vec<State>) -> Self {
        Self { states, distance }
    }

    /// Total cost (traversal time) of the path
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn first(&self) -> Option<&State> {
        self.states.first()
    }

    pub fn last(&self) -> Option<&State> {
        self.states.last()
    }

    pub fn x_coords(&self) -> Vec<f64> {
        self.states.iter().map(|s| s[X]).collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        self.states.iter().map(|s| s[Y]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_equal_within_tolerance() {
        let a = State::new(1.0, 0.0, 2.0, 0.5);
        let b = State::new(1.0005, 0.0, 2.0, 0.5);
        assert!(states_equal(&a, &b, 0.001));
        assert!(!states_equal(&a, &b, 0.0001));
    }

    #[test]
    fn test_spatial_distance_ignores_velocity() {
        let a = State::new(0.0, 5.0, 0.0, -5.0);
        let b = State::new(3.0, 0.0, 4.0, 0.0);
        assert!((spatial_distance(&a, &b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_path_coords() {
        let path = Path::new(
            2.0,
            vec![State::new(0.0, 0.0, 1.0, 0.0), State::new(1.0, 0.0, 2.0, 0.0)],
        );
        assert_eq!(path.len(), 2);
        assert_eq!(path.x_coords(), vec![0.0, 1.0]);
        assert_eq!(path.y_coords(), vec![1.0, 2.0]);
        assert_eq!(path.distance(), 2.0);
    }
}
