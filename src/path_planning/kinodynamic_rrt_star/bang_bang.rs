//! Closed-form bang-bang solver for a single double-integrator axis
//!
//! Given boundary values `(i, idot)` and `(g, gdot)` and a fixed total duration,
//! finds the two-segment constant-acceleration trajectory with the smallest
//! control magnitude that meets both boundaries exactly.
//!
//! Reference: Hauser & Ng-Thow-Hing, "Fast Smoothing of Manipulator
//! Trajectories using Optimal Bounded-Acceleration Shortcuts" (2010), section D.

use crate::common::{State, X, XDOT, Y, YDOT};

/// Roots closer to zero than this are treated as zero acceleration.
const ZERO_ACCEL: f64 = 1e-6;

/// Slack allowed on the switching time before a candidate is rejected.
const SWITCH_TIME_SLACK: f64 = 1e-9;

/// Samples within this distance of either end return the exact boundary state.
const BOUNDARY_SNAP: f64 = 1e-6;

/// Constant-acceleration piece of an axis trajectory
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Segment {
    /// Signed acceleration
    pub u: f64,
    /// Duration, non-negative
    pub t: f64,
}

/// Two-segment trajectory for one axis
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Axis {
    /// Initial position
    pub i: f64,
    /// Initial velocity
    pub idot: f64,
    /// Goal position
    pub g: f64,
    /// Goal velocity
    pub gdot: f64,
    pub s1: Segment,
    pub s2: Segment,
}

impl Axis {
    pub fn total_time(&self) -> f64 {
        self.s1.t + self.s2.t
    }

    /// (position, velocity) at time `t_sec` from the start of the axis.
    pub fn sample(&self, t_sec: f64) -> (f64, f64) {
        let total = self.total_time();
        if t_sec <= 0.0 || t_sec.abs() < BOUNDARY_SNAP {
            (self.i, self.idot)
        } else if t_sec >= total || (t_sec - total).abs() < BOUNDARY_SNAP {
            (self.g, self.gdot)
        } else if t_sec < self.s1.t {
            let x = self.i + self.idot * t_sec + 0.5 * self.s1.u * t_sec * t_sec;
            let xdot = self.idot + self.s1.u * t_sec;
            (x, xdot)
        } else {
            // work backwards from the goal so the end of the segment is exact
            let time_to_go = total - t_sec;
            let x = self.g - self.gdot * time_to_go + 0.5 * self.s2.u * time_to_go * time_to_go;
            let xdot = self.gdot - self.s2.u * time_to_go;
            (x, xdot)
        }
    }

    /// (position, velocity) where the control changes sign.
    pub fn switch_state(&self) -> (f64, f64) {
        let x = self.i + self.idot * self.s1.t + 0.5 * self.s1.u * self.s1.t * self.s1.t;
        let xdot = self.idot + self.s1.u * self.s1.t;
        (x, xdot)
    }
}

/// Coordinated two-axis trajectory; both axes share the same total time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Trajectory {
    pub x: Axis,
    pub y: Axis,
}

impl Trajectory {
    pub fn total_time(&self) -> f64 {
        self.x.total_time().max(self.y.total_time())
    }

    pub fn initial(&self) -> State {
        State::new(self.x.i, self.x.idot, self.y.i, self.y.idot)
    }

    pub fn goal(&self) -> State {
        State::new(self.x.g, self.x.gdot, self.y.g, self.y.gdot)
    }

    /// State at `t_sec`; exact boundary states at and beyond either end.
    pub fn sample(&self, t_sec: f64) -> State {
        let (x, xdot) = self.x.sample(t_sec);
        let (y, ydot) = self.y.sample(t_sec);
        let mut state = State::zeros();
        state[X] = x;
        state[XDOT] = xdot;
        state[Y] = y;
        state[YDOT] = ydot;
        state
    }
}

/// Real roots of `a*x^2 + b*x + c`.
///
/// Uses the cancellation-avoiding form, following KrisLibrary's ParabolicRamp.
pub fn quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a == 0.0 {
        if b == 0.0 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    if c == 0.0 {
        if b == 0.0 {
            return vec![0.0];
        }
        return vec![0.0, -b / a];
    }
    let det = b * b - 4.0 * a * c;
    if det < 0.0 {
        return Vec::new();
    }
    if det == 0.0 {
        return vec![-b / (2.0 * a)];
    }
    let det = det.sqrt();
    let x1 = if (-b - det).abs() < a.abs() {
        0.5 * (-b + det) / a
    } else {
        2.0 * c / (-b - det)
    };
    let x2 = if (-b + det).abs() < a.abs() {
        0.5 * (-b - det) / a
    } else {
        2.0 * c / (-b + det)
    };
    vec![x1, x2]
}

/// Switching time for a root `p` whose first segment accelerates with `u1`.
fn switching_time(
    p: f64,
    u1: f64,
    root_count: usize,
    idot: f64,
    gdot: f64,
    tw: f64,
) -> Option<f64> {
    let is_zero = p.abs() < ZERO_ACCEL;
    // zero acceleration is only a solution when it is the only root
    if is_zero && root_count > 1 {
        return None;
    }
    if p < 0.0 {
        return None;
    }
    let ts = if is_zero {
        tw
    } else {
        0.5 * (tw + (gdot - idot) / u1)
    };
    if ts < -SWITCH_TIME_SLACK || ts > tw + SWITCH_TIME_SLACK {
        return None;
    }
    Some(ts.max(0.0).min(tw))
}

/// Minimum-effort bang-bang trajectory for one axis with total duration `tw`.
///
/// Solves `tw^2 a^2 + sigma (2 tw (idot + gdot) + 4 (i - g)) a - (gdot - idot)^2 = 0`
/// for both signs `sigma` and keeps the smallest admissible acceleration.
/// Returns `None` if `tw` admits no two-segment solution for this axis.
pub fn slow_u(i: f64, idot: f64, g: f64, gdot: f64, tw: f64) -> Option<Axis> {
    let a = tw * tw;
    let b = 2.0 * tw * (idot + gdot) + 4.0 * (i - g);
    let c = -(gdot - idot) * (gdot - idot);

    let plus = quadratic(a, b, c);
    let minus = quadratic(a, -b, c);

    // (magnitude, first-segment acceleration, switching time)
    let mut best: Option<(f64, f64, f64)> = None;
    for (roots, sign) in [(&plus, 1.0), (&minus, -1.0)].iter() {
        for &p in roots.iter() {
            let u1 = sign * p;
            if let Some(ts) = switching_time(p, u1, roots.len(), idot, gdot, tw) {
                if best.map_or(true, |(a_min, _, _)| p < a_min) {
                    best = Some((p, u1, ts));
                }
            }
        }
    }

    best.map(|(_, u1, ts)| Axis {
        i,
        idot,
        g,
        gdot,
        s1: Segment { u: u1, t: ts },
        s2: Segment { u: -u1, t: tw - ts },
    })
}
