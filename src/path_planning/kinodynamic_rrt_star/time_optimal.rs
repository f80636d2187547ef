//! Coordinated time-optimal duration for two decoupled double integrators
//!
//! Each axis is solved on its own in the phase plane, then the axes are
//! coordinated by slowing the faster one while respecting the "gap" in which
//! an axis has no single-switch solution (LaSalle et al., "Bang-Bang RRT",
//! 2023, proposition 1).
//!
//! Intercepts: every state lies on exactly one `+umax` parabola and one
//! `-umax` parabola; their position at zero velocity is the intercept.

use ordered_float::OrderedFloat;

use crate::common::{PlannerError, PlannerResult, State, X, XDOT, Y, YDOT};

/// A switch path whose segment comes out shorter than this is not a path.
const SEGMENT_SLACK: f64 = 1e-9;

/// Kind of per-axis candidate duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solution {
    /// Fastest path through the switching surface
    Switch,
    /// Slowest path that does not cross zero velocity; the gap starts here
    Limit,
    /// Slowest path that does cross zero velocity; the gap ends here
    Mirror,
}

/// Intercept of the positive-U parabola through `(x, xdot)`.
pub fn c_plus(x: f64, xdot: f64, umax: f64) -> f64 {
    x - xdot.powi(2) / (2.0 * umax)
}

/// Intercept of the negative-U parabola through `(x, xdot)`.
pub fn c_minus(x: f64, xdot: f64, umax: f64) -> f64 {
    x - xdot.powi(2) / (-2.0 * umax)
}

/// Whether the goal lies to the right of the switching surface through the
/// initial state.
pub fn goal_right(i: f64, idot: f64, g: f64, gdot: f64, umax: f64) -> bool {
    if gdot > idot {
        return c_plus(g, gdot, umax) > c_plus(i, idot, umax);
    }
    c_minus(g, gdot, umax) > c_minus(i, idot, umax)
}

/// Switch position for the path that starts with +U and ends with -U.
fn q_switch_iplus_gminus(i: f64, idot: f64, g: f64, gdot: f64, umax: f64) -> f64 {
    (c_plus(i, idot, umax) + c_minus(g, gdot, umax)) / 2.0
}

/// Switch position for the path that starts with -U and ends with +U.
fn q_switch_iminus_gplus(i: f64, idot: f64, g: f64, gdot: f64, umax: f64) -> f64 {
    (c_minus(i, idot, umax) + c_plus(g, gdot, umax)) / 2.0
}

/// Switch velocity on the I+G- path; always positive, NaN if unreachable.
fn q_dot_switch_iplus_gminus(i: f64, idot: f64, g: f64, gdot: f64, umax: f64) -> f64 {
    (2.0 * umax * (q_switch_iplus_gminus(i, idot, g, gdot, umax) - c_plus(i, idot, umax))).sqrt()
}

/// Switch velocity on the I-G+ path; always negative, NaN if unreachable.
fn q_dot_switch_iminus_gplus(i: f64, idot: f64, g: f64, gdot: f64, umax: f64) -> f64 {
    -(2.0 * umax * (q_switch_iminus_gplus(i, idot, g, gdot, umax) - c_plus(g, gdot, umax))).sqrt()
}

fn q_dot_limit_iplus_gminus(i: f64, idot: f64, g: f64, gdot: f64, umax: f64) -> f64 {
    -q_dot_switch_iplus_gminus(i, idot, g, gdot, umax)
}

fn q_dot_limit_iminus_gplus(i: f64, idot: f64, g: f64, gdot: f64, umax: f64) -> f64 {
    -q_dot_switch_iminus_gplus(i, idot, g, gdot, umax)
}

/// Total of two segment durations; NaN if either runs backwards in time.
fn two_segments(t_1: f64, t_2: f64) -> f64 {
    if t_1 < -SEGMENT_SLACK || t_2 < -SEGMENT_SLACK {
        return f64::NAN;
    }
    t_1 + t_2
}

fn t_switch_iplus_gminus(i: f64, idot: f64, g: f64, gdot: f64, umax: f64) -> f64 {
    let q_dot_switch = q_dot_switch_iplus_gminus(i, idot, g, gdot, umax);
    let t_1 = (q_dot_switch - idot) / umax;
    let t_2 = (gdot - q_dot_switch) / -umax;
    two_segments(t_1, t_2)
}

fn t_switch_iminus_gplus(i: f64, idot: f64, g: f64, gdot: f64, umax: f64) -> f64 {
    let q_dot_switch = q_dot_switch_iminus_gplus(i, idot, g, gdot, umax);
    let t_1 = (q_dot_switch - idot) / -umax;
    let t_2 = (gdot - q_dot_switch) / umax;
    two_segments(t_1, t_2)
}

fn feasible(t: f64) -> bool {
    !t.is_nan() && t <= 1e100 && t >= 0.0
}

/// Fastest single-axis time through the switching surface.
///
/// Both sub-cases (I+G- and I-G+) are evaluated; the faster feasible one wins.
/// A sub-case is feasible only if both of its segments have non-negative
/// duration.
/// Returns `None` when neither is feasible.
pub fn t_switch(i: f64, idot: f64, g: f64, gdot: f64, umax: f64) -> Option<f64> {
    let t_iplus_gminus = t_switch_iplus_gminus(i, idot, g, gdot, umax);
    let t_iminus_gplus = t_switch_iminus_gplus(i, idot, g, gdot, umax);
    match (feasible(t_iplus_gminus), feasible(t_iminus_gplus)) {
        (true, true) => Some(t_iplus_gminus.min(t_iminus_gplus)),
        (true, false) => Some(t_iplus_gminus),
        (false, true) => Some(t_iminus_gplus),
        (false, false) => None,
    }
}

/// Slowest single-axis time that does not cross zero velocity.
///
/// NaN when either limit velocity is unreachable.
pub fn t_limit(i: f64, idot: f64, g: f64, gdot: f64, umax: f64) -> f64 {
    let q_dot_iplus_gminus = q_dot_limit_iplus_gminus(i, idot, g, gdot, umax);
    let q_dot_iminus_gplus = q_dot_limit_iminus_gplus(i, idot, g, gdot, umax);
    if q_dot_iplus_gminus.is_nan() || q_dot_iminus_gplus.is_nan() {
        return f64::NAN;
    }
    // the slow path goes through the smaller limit velocity
    if q_dot_iplus_gminus.abs() > q_dot_iminus_gplus.abs() {
        let q_dot_limit = q_dot_iminus_gplus;
        return (q_dot_limit - idot) / -umax + (gdot - q_dot_limit) / umax;
    }
    let q_dot_limit = q_dot_iplus_gminus;
    (q_dot_limit - idot) / umax + (gdot - q_dot_limit) / -umax
}

/// Slowest single-axis time that crosses zero velocity.
///
/// `t_mirror - t_limit` is the width of the gap.
pub fn t_mirror(i: f64, idot: f64, g: f64, gdot: f64, umax: f64) -> f64 {
    let t_limit = t_limit(i, idot, g, gdot, umax);
    if t_limit.is_nan() {
        return f64::NAN;
    }
    let q_dot_iplus_gminus = q_dot_limit_iplus_gminus(i, idot, g, gdot, umax);
    let q_dot_iminus_gplus = q_dot_limit_iminus_gplus(i, idot, g, gdot, umax);
    if q_dot_iplus_gminus.abs() > q_dot_iminus_gplus.abs() {
        let q_dot_limit = q_dot_iminus_gplus;
        return t_limit + 2.0 * q_dot_limit / umax - 2.0 * q_dot_limit / -umax;
    }
    let q_dot_limit = q_dot_iplus_gminus;
    t_limit + 2.0 * q_dot_limit / -umax - 2.0 * q_dot_limit / umax
}

fn valid(t: f64) -> bool {
    !t.is_nan() && t >= 0.0
}

fn put(candidates: &mut Vec<(f64, Solution)>, t: f64, solution: Solution) {
    if valid(t) {
        candidates.push((t, solution));
    }
}

/// The three tagged candidate durations for one axis.
fn axis_candidates(i: f64, idot: f64, g: f64, gdot: f64, umax: f64) -> [(f64, Solution); 3] {
    [
        (t_switch(i, idot, g, gdot, umax).unwrap_or(f64::NAN), Solution::Switch),
        (t_limit(i, idot, g, gdot, umax), Solution::Limit),
        (t_mirror(i, idot, g, gdot, umax), Solution::Mirror),
    ]
}

/// Minimum duration at which both axes admit a bang-bang solution.
///
/// States are `(x, xdot, y, ydot)`. For time reversal the caller swaps the
/// arguments.
///
/// # Errors
///
/// `NumericalError` if no candidate satisfies both axes, which the phase-plane
/// geometry rules out for real boundary values.
pub fn t_optimal(x_i: &State, x_g: &State, umax: f64) -> PlannerResult<f64> {
    let x = axis_candidates(x_i[X], x_i[XDOT], x_g[X], x_g[XDOT], umax);
    let y = axis_candidates(x_i[Y], x_i[YDOT], x_g[Y], x_g[YDOT], umax);

    let mut candidates = Vec::with_capacity(6);
    for k in 0..3 {
        for axis in [&x, &y].iter() {
            let (t, solution) = axis[k];
            // without a gap start there is no gap end to count
            if solution == Solution::Mirror && !valid(axis[1].0) {
                continue;
            }
            put(&mut candidates, t, solution);
        }
    }
    // stable: ties keep the switch, limit, mirror order
    candidates.sort_by_key(|&(t, _)| OrderedFloat(t));

    let mut solved = 0;
    for &(t, solution) in &candidates {
        match solution {
            Solution::Switch | Solution::Mirror => solved += 1,
            Solution::Limit => solved -= 1,
        }
        if solved == 2 {
            return Ok(t);
        }
    }
    Err(PlannerError::NumericalError(format!(
        "no coordinated time from {:?} to {:?}: x {:?} y {:?}",
        x_i.as_slice(),
        x_g.as_slice(),
        x,
        y
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_planning::kinodynamic_rrt_star::bang_bang::slow_u;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_intercepts() {
        assert!((c_plus(0.0, 2.0, 1.0) + 2.0).abs() < 1e-12);
        assert!((c_minus(0.0, 2.0, 1.0) - 2.0).abs() < 1e-12);
        assert_eq!(c_plus(1.5, 0.0, 1.0), c_minus(1.5, 0.0, 1.0));
    }

    #[test]
    fn test_goal_right() {
        assert!(goal_right(0.0, 0.0, 1.0, 0.0, 1.0));
        assert!(!goal_right(1.0, 0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_t_switch_rest_to_rest() {
        let t = t_switch(0.0, 0.0, 1.0, 0.0, 1.0).unwrap();
        assert!((t - 2.0).abs() < 1e-9);
        let t = t_switch(1.0, 0.0, 0.0, 0.0, 1.0).unwrap();
        assert!((t - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_rest_to_rest_has_no_gap() {
        assert!(t_limit(0.0, 0.0, 1.0, 0.0, 1.0).is_nan());
        assert!(t_mirror(0.0, 0.0, 1.0, 0.0, 1.0).is_nan());
    }

    #[test]
    fn test_t_optimal_identical_states_is_zero() {
        let x = State::new(1.5, 0.0, -2.0, 0.0);
        assert_eq!(t_optimal(&x, &x, 2.5).unwrap(), 0.0);
    }

    #[test]
    fn test_t_optimal_single_axis_move() {
        let x_i = State::new(0.0, 0.0, 0.0, 0.0);
        let x_g = State::new(1.0, 0.0, 0.0, 0.0);
        let t = t_optimal(&x_i, &x_g, 1.0).unwrap();
        assert!((t - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_t_optimal_overshoot_uses_mirror() {
        // moving too fast toward the goal: brake past it and come back
        let x_i = State::new(0.0, 2.0, 0.0, 0.0);
        let x_g = State::new(1.0, 0.0, 0.0, 0.0);
        let t = t_optimal(&x_i, &x_g, 1.0).unwrap();
        assert!((t - 4.0).abs() < 1e-9);
        assert!(slow_u(0.0, 2.0, 1.0, 0.0, t).is_some());
    }

    #[test]
    fn test_t_optimal_coordinates_to_slower_axis() {
        let x_i = State::new(0.0, 0.0, 0.0, 0.0);
        let x_g = State::new(1.0, 0.0, 4.0, 0.0);
        let t = t_optimal(&x_i, &x_g, 1.0).unwrap();
        assert!((t - 4.0).abs() < 1e-9);
        // the faster axis is slowed to match
        let x = slow_u(0.0, 0.0, 1.0, 0.0, t).unwrap();
        assert!(x.s1.u.abs() < 1.0);
    }

    #[test]
    fn test_t_optimal_is_asymmetric() {
        let a = State::new(0.0, 1.0, 0.0, 0.0);
        let b = State::new(1.0, 0.0, 0.0, 0.0);
        let forward = t_optimal(&a, &b, 1.0).unwrap();
        let backward = t_optimal(&b, &a, 1.0).unwrap();
        assert!((forward - backward).abs() > 1e-3);
    }

    #[test]
    fn test_t_switch_ignores_segment_running_backwards() {
        // the I+G- sum is 0.0019 but its first segment has negative duration
        let (i, idot) = (1.4565808250808558, 1.4715138831512768);
        let (g, gdot) = (1.3961345332426731, 0.6807566937363685);
        assert!(t_switch_iplus_gminus(i, idot, g, gdot, 2.5).is_nan());
        let t = t_switch(i, idot, g, gdot, 2.5).unwrap();
        assert!((t - 1.8293732832689398).abs() < 1e-9);
    }

    #[test]
    fn test_t_optimal_waits_for_slower_axis_switch() {
        let x_i = State::new(
            4.8254975875714585,
            -0.6278208291846514,
            1.4565808250808558,
            1.4715138831512768,
        );
        let x_g = State::new(
            -4.459419310746022,
            0.8857213573209664,
            1.3961345332426731,
            0.6807566937363685,
        );
        let t = t_optimal(&x_i, &x_g, 2.5).unwrap();
        let x_switch = t_switch(x_i[X], x_i[XDOT], x_g[X], x_g[XDOT], 2.5).unwrap();
        assert!((t - x_switch).abs() < 1e-9);
        assert!((t - 4.00611276778749).abs() < 1e-9);
        for k in [X, Y].iter() {
            let axis = slow_u(x_i[*k], x_i[*k + 1], x_g[*k], x_g[*k + 1], t).unwrap();
            assert!(axis.s1.u.abs() <= 2.5 + 1e-6, "axis {} needs {}", k, axis.s1.u);
        }
    }

    #[test]
    fn test_t_optimal_random_states_always_solvable() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let x_i = State::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-2.0..2.0),
            );
            let x_g = State::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-2.0..2.0),
            );
            let t = t_optimal(&x_i, &x_g, 2.5);
            assert!(t.is_ok(), "{:?}", t);
            let t = t.unwrap();
            assert!(t >= 0.0);
            // both axes can finish at t within the acceleration bound
            for k in [X, Y].iter() {
                let axis = slow_u(x_i[*k], x_i[*k + 1], x_g[*k], x_g[*k + 1], t).unwrap();
                let u = axis.s1.u;
                assert!(u.abs() <= 2.5 + 1e-6, "{:?} -> {:?} needs {}", x_i, x_g, u);
            }
        }
    }
}
