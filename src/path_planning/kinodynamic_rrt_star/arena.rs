//! Rectangular state-space bounds with circular obstacles

use crate::common::{spatial_distance, CollisionOracle, State, X, Y};

/// Collision oracle for a bounded field with round obstacles.
///
/// Velocities are bounded like positions; obstacles only block `(x, y)`.
#[derive(Debug, Clone)]
pub struct CircleArena {
    min: State,
    max: State,
    /// (x, y, radius)
    pub obstacle_list: Vec<(f64, f64, f64)>,
    pub robot_radius: f64,
    /// Spacing of the checks along a straight link
    pub link_resolution: f64,
}

impl CircleArena {
    pub fn new(min: State, max: State, obstacle_list: Vec<(f64, f64, f64)>) -> Self {
        Self {
            min,
            max,
            obstacle_list,
            robot_radius: 0.0,
            link_resolution: 0.05,
        }
    }

    /// Empty field
    pub fn open(min: State, max: State) -> Self {
        Self::new(min, max, Vec::new())
    }

    pub fn with_robot_radius(mut self, robot_radius: f64) -> Self {
        self.robot_radius = robot_radius;
        self
    }

    fn in_bounds(&self, state: &State) -> bool {
        (0..4).all(|k| state[k] >= self.min[k] && state[k] <= self.max[k])
    }

    fn collides(&self, state: &State) -> bool {
        self.obstacle_list.iter().any(|&(ox, oy, size)| {
            let d = (state[X] - ox).powi(2) + (state[Y] - oy).powi(2);
            d <= (size + self.robot_radius).powi(2)
        })
    }
}

impl CollisionOracle for CircleArena {
    fn clear(&self, state: &State) -> bool {
        self.in_bounds(state) && !self.collides(state)
    }

    fn link(&self, from: &State, to: &State) -> bool {
        let n_expand = (spatial_distance(from, to) / self.link_resolution).ceil().max(1.0) as usize;
        (0..=n_expand).all(|k| {
            let s = from + (to - from) * (k as f64 / n_expand as f64);
            self.clear(&s)
        })
    }

    fn bounds(&self) -> (State, State) {
        (self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> CircleArena {
        CircleArena::new(
            State::new(0.0, -2.0, 0.0, -2.0),
            State::new(10.0, 2.0, 10.0, 2.0),
            vec![(5.0, 5.0, 1.0)],
        )
    }

    #[test]
    fn test_clear() {
        let arena = arena();
        assert!(arena.clear(&State::new(1.0, 0.0, 1.0, 0.0)));
        assert!(!arena.clear(&State::new(5.0, 0.0, 5.5, 0.0)));
        assert!(!arena.clear(&State::new(11.0, 0.0, 1.0, 0.0)));
        assert!(!arena.clear(&State::new(1.0, 3.0, 1.0, 0.0)));
    }

    #[test]
    fn test_robot_radius_inflates_obstacles() {
        let arena = arena().with_robot_radius(0.5);
        assert!(!arena.clear(&State::new(6.3, 0.0, 5.0, 0.0)));
        assert!(arena.clear(&State::new(6.6, 0.0, 5.0, 0.0)));
    }

    #[test]
    fn test_link() {
        let arena = arena();
        let a = State::new(1.0, 0.0, 5.0, 0.0);
        let b = State::new(9.0, 0.0, 5.0, 0.0);
        let c = State::new(1.0, 0.0, 9.0, 0.0);
        assert!(!arena.link(&a, &b));
        assert!(arena.link(&a, &c));
    }
}
