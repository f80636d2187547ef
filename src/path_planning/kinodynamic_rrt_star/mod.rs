//! Kinodynamic RRT* Module
//!
//! Sampling-based planning for a point mass whose two axes are independent
//! double integrators with bounded acceleration. Trees are extended with
//! closed-form bang-bang trajectories that complete both axes at the same
//! time, and the two trees are linked with a numerical shooting solver.
//!
//! # Components
//!
//! - `bang_bang`: per-axis two-segment trajectories for a fixed duration
//! - `time_optimal`: shortest time at which both axes can arrive together
//! - `steering`: collision-checked trajectories between two states
//! - `shooting`: RK4 integration and a two-knot Gauss-Newton shooting solver
//! - `tree`: arena tree with a spatial index
//! - `planner`: the RRT* loop itself
//! - `events`: structured progress reporting
//! - `arena`: bounded field with circular obstacles
//!
//! # Example
//!
//! ```no_run
//! use kinodynamic_rrt::common::{Control, State};
//! use kinodynamic_rrt::path_planning::kinodynamic_rrt_star::{
//!     CircleArena, KinodynamicRRTStar, NewtonShootingSolver, PlannerConfig,
//! };
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let arena = CircleArena::new(
//!     State::new(0.0, -2.0, 0.0, -2.0),
//!     State::new(10.0, 2.0, 10.0, 2.0),
//!     vec![(5.0, 5.0, 1.0)],
//! );
//! let config = PlannerConfig { bidirectional: true, ..Default::default() };
//! let u_max = Control::new(config.u_max, config.u_max);
//! let solver = NewtonShootingSolver::new(u_max, 3.0, 20);
//! let mut planner = KinodynamicRRTStar::new(
//!     arena,
//!     solver,
//!     StdRng::seed_from_u64(0),
//!     State::new(1.0, 0.0, 1.0, 0.0),
//!     State::new(9.0, 0.0, 9.0, 0.0),
//!     config,
//! )
//! .unwrap();
//!
//! for _ in 0..1000 {
//!     planner.step().unwrap();
//! }
//! if let Some(path) = planner.best_path() {
//!     println!("best path time {}", path.distance());
//! }
//! ```
//!
//! # References
//!
//! - LaSalle, Stein, et al., "Bang-Bang RRT", 2023
//! - Hauser and Ng-Thow-Hing, "Fast smoothing of manipulator trajectories
//!   using optimal bounded-acceleration shortcuts", 2010

pub mod arena;
pub mod bang_bang;
pub mod events;
pub mod planner;
pub mod shooting;
pub mod steering;
pub mod time_optimal;
pub mod tree;

// Re-exports
pub use arena::CircleArena;
pub use bang_bang::{quadratic, slow_u, Axis, Segment, Trajectory};
pub use events::{EventRecorder, EventSink, LogSink, PlannerEvent, RejectReason, TreeSlot};
pub use planner::{KinodynamicRRTStar, Link, PlannerConfig, SamplingStrategy};
pub use shooting::{double_integrator, rk4, NewtonShootingSolver};
pub use steering::{bang_bang_steer, optimal_trajectory};
pub use time_optimal::t_optimal;
pub use tree::{Edge, NearNode, Node, NodeId, Tree};
