//! Numerical shooting solver for arbitrary dynamics
//!
//! Searches for a piecewise-constant control with two knots, each held for
//! half of the duration, that carries one state onto another. Durations are
//! tried shortest first on a grid up to the maximum; for each one the four
//! knot controls are refined with damped Gauss-Newton on the end-state
//! residual, so the system is square. The dynamics are integrated with
//! fixed-step RK4.

use nalgebra::{Matrix4, Vector4};

use crate::common::{Control, Dynamics, ShootingSolution, ShootingSolver, State, XDOT, YDOT};

/// Finite-difference step for the Jacobian
const FD_STEP: f64 = 1e-7;
/// Levenberg damping added to the normal equations
const DAMPING: f64 = 1e-9;
/// Slack on the duration and control bounds
const BOUND_SLACK: f64 = 1e-9;

/// Two decoupled double integrators: `(x, xdot, y, ydot)' = (xdot, ux, ydot, uy)`.
pub fn double_integrator(x: &State, u: &Control) -> State {
    State::new(x[XDOT], u[0], x[YDOT], u[1])
}

/// One classical Runge-Kutta step of length `dt` (may be negative).
pub fn rk4(f: Dynamics, x: &State, u: &Control, dt: f64) -> State {
    let k1 = f(x, u);
    let k2 = f(&(x + k1 * (dt / 2.0)), u);
    let k3 = f(&(x + k2 * (dt / 2.0)), u);
    let k4 = f(&(x + k3 * dt), u);
    x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

fn knots(p: &Vector4<f64>) -> [Control; 2] {
    [Control::new(p[0], p[1]), Control::new(p[2], p[3])]
}

/// Gauss-Newton shooting over a two-knot control
#[derive(Debug, Clone)]
pub struct NewtonShootingSolver {
    /// Per-axis control bound
    u_max: Control,
    /// Longest admissible duration
    max_dt: f64,
    /// RK4 sub-steps per solve, shared between the knots
    steps: usize,
    /// Number of grid durations in `(0, max_dt]`
    durations: usize,
    /// Accepted end-state residual norm
    tolerance: f64,
    /// Gauss-Newton iterations per duration
    max_iterations: usize,
}

impl NewtonShootingSolver {
    pub fn new(u_max: Control, max_dt: f64, steps: usize) -> Self {
        Self {
            u_max,
            max_dt,
            steps: steps.max(2),
            durations: 20,
            tolerance: 1e-6,
            max_iterations: 30,
        }
    }

    pub fn with_durations(mut self, durations: usize) -> Self {
        self.durations = durations.max(1);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Apply each control of `controls` for an equal share of `dt`.
    pub fn integrate(&self, f: Dynamics, x: &State, controls: &[Control], dt: f64) -> State {
        if controls.is_empty() {
            return *x;
        }
        let per_knot = (self.steps / controls.len()).max(1);
        let h = dt / (controls.len() * per_knot) as f64;
        controls.iter().fold(*x, |state, u| {
            (0..per_knot).fold(state, |s, _| rk4(f, &s, u, h))
        })
    }

    fn residual(&self, f: Dynamics, x1: &State, x2: &State, dt: f64, p: &Vector4<f64>) -> State {
        self.integrate(f, x1, &knots(p), dt) - x2
    }

    fn refine(&self, f: Dynamics, x1: &State, x2: &State, dt: f64) -> Vector4<f64> {
        let mut p = Vector4::zeros();
        for _ in 0..self.max_iterations {
            let r = self.residual(f, x1, x2, dt, &p);
            if r.norm() < self.tolerance {
                break;
            }
            let mut jacobian = Matrix4::zeros();
            for k in 0..4 {
                let mut q = p;
                q[k] += FD_STEP;
                let rk = self.residual(f, x1, x2, dt, &q);
                jacobian.set_column(k, &((rk - r) / FD_STEP));
            }
            let jt = jacobian.transpose();
            let normal = jt * jacobian + Matrix4::identity() * DAMPING;
            match normal.try_inverse() {
                Some(inverse) => p -= inverse * (jt * r),
                None => break,
            }
        }
        p
    }

    fn admissible(&self, f: Dynamics, x1: &State, x2: &State, dt: f64, p: &Vector4<f64>) -> bool {
        knots(p).iter().all(|u| {
            u[0].abs() <= self.u_max[0] + BOUND_SLACK && u[1].abs() <= self.u_max[1] + BOUND_SLACK
        }) && self.residual(f, x1, x2, dt, p).norm() < self.tolerance
    }
}

impl ShootingSolver for NewtonShootingSolver {
    /// Shortest grid duration with an admissible control, if any.
    fn solve(
        &self,
        dynamics: Dynamics,
        x1: &State,
        x2: &State,
        forward: bool,
    ) -> Option<ShootingSolution> {
        let sign = if forward { 1.0 } else { -1.0 };
        (1..=self.durations).find_map(|k| {
            let dt = sign * self.max_dt * k as f64 / self.durations as f64;
            let p = self.refine(dynamics, x1, x2, dt);
            if self.admissible(dynamics, x1, x2, dt, &p) {
                Some(ShootingSolution { dt, controls: knots(&p) })
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_planning::kinodynamic_rrt_star::time_optimal::t_optimal;

    fn solver() -> NewtonShootingSolver {
        NewtonShootingSolver::new(Control::new(2.5, 2.5), 0.6, 20)
    }

    fn assert_reaches(solver: &NewtonShootingSolver, x1: &State, x2: &State, s: &ShootingSolution) {
        let end = solver.integrate(double_integrator, x1, &s.controls, s.dt);
        assert!((end - x2).norm() < 1e-5);
        for u in s.controls.iter() {
            assert!(u[0].abs() <= 2.5 + 1e-9 && u[1].abs() <= 2.5 + 1e-9);
        }
    }

    #[test]
    fn test_rk4_exact_for_constant_acceleration() {
        let x = State::new(0.0, 1.0, 2.0, 0.0);
        let u = Control::new(1.0, -2.0);
        let next = rk4(double_integrator, &x, &u, 0.5);
        assert!((next[0] - (0.5 + 0.125)).abs() < 1e-12);
        assert!((next[1] - 1.5).abs() < 1e-12);
        assert!((next[2] - (2.0 - 0.25)).abs() < 1e-12);
        assert!((next[3] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_integrate_switches_knots_halfway() {
        let x = State::zeros();
        let controls = [Control::new(1.0, 0.0), Control::new(-1.0, 0.0)];
        let end = solver().integrate(double_integrator, &x, &controls, 2.0);
        // accelerate for 1 then brake for 1: back at rest one unit along
        assert!((end - State::new(1.0, 0.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_solve_forward() {
        let x1 = State::new(0.0, 1.0, 0.0, 0.0);
        let controls = [Control::new(1.0, 0.5), Control::new(1.0, 0.5)];
        let x2 = solver().integrate(double_integrator, &x1, &controls, 0.4);
        let solution = solver().solve(double_integrator, &x1, &x2, true).unwrap();
        assert!(solution.dt > 0.0 && solution.dt <= 0.4 + 1e-9);
        assert_reaches(&solver(), &x1, &x2, &solution);
    }

    #[test]
    fn test_solve_time_reversed() {
        let x1 = State::new(1.0, 0.5, 1.0, -0.5);
        let controls = [Control::new(-1.5, 2.0), Control::new(0.5, -1.0)];
        let x2 = solver().integrate(double_integrator, &x1, &controls, -0.3);
        let solution = solver().solve(double_integrator, &x1, &x2, false).unwrap();
        assert!(solution.dt < 0.0 && solution.dt >= -0.3 - 1e-9);
        assert_reaches(&solver(), &x1, &x2, &solution);
    }

    #[test]
    fn test_solve_rest_to_rest_close_to_time_optimal() {
        let solver = NewtonShootingSolver::new(Control::new(2.5, 2.5), 2.0, 20).with_durations(30);
        let x1 = State::zeros();
        let x2 = State::new(1.0, 0.0, 0.0, 0.0);
        let solution = solver.solve(double_integrator, &x1, &x2, true).unwrap();
        assert_reaches(&solver, &x1, &x2, &solution);
        // bang-bang with the switch halfway, one grid step above the optimum
        let t = t_optimal(&x1, &x2, 2.5).unwrap();
        assert!(solution.dt >= t);
        assert!(solution.dt - t < 2.0 / 30.0);
        assert!(solution.controls[0][0] > 2.4 && solution.controls[1][0] < -2.4);
        assert!(solution.controls[0][1].abs() < 1e-6 && solution.controls[1][1].abs() < 1e-6);
    }

    #[test]
    fn test_solve_rest_to_rest_too_far_for_duration() {
        // needs u = 1 / 0.3^2 > 2.5 within 0.6
        let x1 = State::new(0.0, 0.0, 0.0, 0.0);
        let x2 = State::new(1.0, 0.0, 0.0, 0.0);
        assert!(solver().solve(double_integrator, &x1, &x2, true).is_none());
    }

    #[test]
    fn test_solve_respects_duration_limit() {
        // reachable at constant velocity, but only after 2 time units
        let x1 = State::new(0.0, 1.0, 0.0, 0.0);
        let x2 = State::new(2.0, 1.0, 0.0, 0.0);
        assert!(solver().solve(double_integrator, &x1, &x2, true).is_none());
    }

    #[test]
    fn test_solve_respects_control_limit() {
        // gaining 2.5 of speed at 2.5 takes a full time unit
        let x1 = State::new(0.0, 0.0, 0.0, 0.0);
        let controls = [Control::new(5.0, 0.0), Control::new(5.0, 0.0)];
        let x2 = solver().integrate(double_integrator, &x1, &controls, 0.5);
        assert!(solver().solve(double_integrator, &x1, &x2, true).is_none());
    }
}
