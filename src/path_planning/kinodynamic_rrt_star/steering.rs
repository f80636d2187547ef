//! Bang-bang steering between two full states
//!
//! Builds the coordinated time-optimal trajectory and checks it against a
//! collision predicate by sampling at a fixed time step. Rather than stopping
//! at the first obstacle and re-planning to rest there, a blocked trajectory
//! is simply rejected.

use crate::common::{PlannerResult, State, X, XDOT, Y, YDOT};

use super::bang_bang::{slow_u, Axis, Trajectory};
use super::time_optimal::t_optimal;

/// Time step used when checking a trajectory for collisions.
pub const SAMPLE_STEP: f64 = 0.1;

/// Acceleration above `umax` tolerated from rounding in the axis solver.
pub const CONTROL_SLACK: f64 = 1e-6;

/// Trajectory from `x_i` to `x_g` completing both axes at the same time.
///
/// Returns `Ok(None)` if either axis has no two-segment solution at the
/// coordinated time, or needs more than `umax` to finish by then. For time
/// reversal the caller swaps the arguments.
pub fn optimal_trajectory(
    x_i: &State,
    x_g: &State,
    umax: f64,
) -> PlannerResult<Option<Trajectory>> {
    let tw = t_optimal(x_i, x_g, umax)?;
    let x = slow_u(x_i[X], x_i[XDOT], x_g[X], x_g[XDOT], tw);
    let y = slow_u(x_i[Y], x_i[YDOT], x_g[Y], x_g[YDOT], tw);
    Ok(match (x, y) {
        (Some(x), Some(y)) if within_limit(&x, umax) && within_limit(&y, umax) => {
            Some(Trajectory { x, y })
        }
        _ => None,
    })
}

fn within_limit(axis: &Axis, umax: f64) -> bool {
    axis.s1.u.abs() <= umax + CONTROL_SLACK && axis.s2.u.abs() <= umax + CONTROL_SLACK
}

/// Collision-checked steering from `x_i` to `x_g`.
///
/// When `time_forward` is false the trajectory runs from `x_g` to `x_i`,
/// which is how a tree rooted at the goal grows.
///
/// Returns `Ok(None)` if no trajectory exists or any sample is not free.
pub fn bang_bang_steer<F>(
    free: F,
    x_i: &State,
    x_g: &State,
    time_forward: bool,
    umax: f64,
) -> PlannerResult<Option<Trajectory>>
where
    F: Fn(&State) -> bool,
{
    let trajectory = if time_forward {
        optimal_trajectory(x_i, x_g, umax)?
    } else {
        optimal_trajectory(x_g, x_i, umax)?
    };
    let trajectory = match trajectory {
        Some(t) => t,
        None => return Ok(None),
    };

    let t_max = trajectory.total_time();
    let mut k = 0;
    loop {
        let t_sec = (k as f64 * SAMPLE_STEP).min(t_max);
        if !free(&trajectory.sample(t_sec)) {
            return Ok(None);
        }
        if t_sec >= t_max {
            break;
        }
        k += 1;
    }
    Ok(Some(trajectory))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::cell::Cell;

    #[test]
    fn test_optimal_trajectory_rest_to_rest() {
        let x_i = State::new(0.0, 0.0, 0.0, 0.0);
        let x_g = State::new(1.0, 0.0, 0.0, 0.0);
        let trajectory = optimal_trajectory(&x_i, &x_g, 1.0).unwrap().unwrap();
        assert!((trajectory.total_time() - 2.0).abs() < 1e-9);
        assert!((trajectory.x.s1.u - 1.0).abs() < 1e-9);
        assert!((trajectory.x.s1.t - 1.0).abs() < 1e-9);
        assert!((trajectory.x.s2.u + 1.0).abs() < 1e-9);
        assert!((trajectory.x.s2.t - 1.0).abs() < 1e-9);
        let (q, _) = trajectory.x.switch_state();
        assert!((q - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_steer_samples_whole_trajectory() {
        let x_i = State::new(0.0, 0.0, 0.0, 0.0);
        let x_g = State::new(1.0, 0.0, 1.0, 0.0);
        let calls = Cell::new(0);
        let trajectory = bang_bang_steer(
            |_| {
                calls.set(calls.get() + 1);
                true
            },
            &x_i,
            &x_g,
            true,
            1.0,
        )
        .unwrap()
        .unwrap();
        // 0.0, 0.1, ..., 1.9 and the exact end point
        assert_eq!(calls.get(), 21);
        assert_eq!(trajectory.sample(0.0), x_i);
        assert_eq!(trajectory.sample(trajectory.total_time()), x_g);
    }

    #[test]
    fn test_steer_rejects_blocked_trajectory() {
        let x_i = State::new(0.0, 0.0, 0.0, 0.0);
        let x_g = State::new(2.0, 0.0, 0.0, 0.0);
        // wall at x = 1
        let result = bang_bang_steer(|s| (s[X] - 1.0).abs() > 0.05, &x_i, &x_g, true, 1.0).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_steer_time_reversed_swaps_endpoints() {
        let x_root = State::new(5.0, 0.0, 5.0, 0.0);
        let x_rand = State::new(3.0, 0.5, 4.0, -0.5);
        let trajectory = bang_bang_steer(|_| true, &x_root, &x_rand, false, 2.5)
            .unwrap()
            .unwrap();
        assert_eq!(trajectory.initial(), x_rand);
        assert_eq!(trajectory.goal(), x_root);
    }

    #[test]
    fn test_trajectories_respect_control_bound() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut found = 0;
        for _ in 0..500 {
            let x_i = State::new(
                rng.gen_range(0.0..10.0),
                rng.gen_range(-2.0..2.0),
                rng.gen_range(0.0..10.0),
                rng.gen_range(-2.0..2.0),
            );
            let x_g = State::new(
                rng.gen_range(0.0..10.0),
                rng.gen_range(-2.0..2.0),
                rng.gen_range(0.0..10.0),
                rng.gen_range(-2.0..2.0),
            );
            if let Some(trajectory) = optimal_trajectory(&x_i, &x_g, 2.5).unwrap() {
                found += 1;
                assert!(within_limit(&trajectory.x, 2.5));
                assert!(within_limit(&trajectory.y, 2.5));
                let tw = t_optimal(&x_i, &x_g, 2.5).unwrap();
                assert!((trajectory.total_time() - tw).abs() < 1e-6);
            }
        }
        assert_eq!(found, 500);
    }

    #[test]
    fn test_within_limit_rejects_hard_axis() {
        let axis = slow_u(0.0, 0.0, 10.0, 0.0, 0.5).unwrap();
        assert!(axis.s1.u.abs() > 2.5);
        assert!(!within_limit(&axis, 2.5));
        assert!(within_limit(&axis, axis.s1.u.abs()));
    }

    #[test]
    fn test_steer_identical_states_has_no_trajectory() {
        let x = State::new(1.0, 0.0, 1.0, 0.0);
        assert!(bang_bang_steer(|_| true, &x, &x, true, 1.0).unwrap().is_none());
    }
}
