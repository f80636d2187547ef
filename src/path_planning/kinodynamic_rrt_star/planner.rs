//! Bidirectional kinodynamic RRT* over two double-integrator axes
//!
//! Tree A grows forward in time from the initial state, tree B grows backward
//! in time from the goal. In-tree extensions use the closed-form bang-bang
//! steering; links between the trees and rewiring use a numerical shooting
//! solver, since those connect arbitrary state pairs.
//!
//! Unlike the usual RRT* formulation there is no Extend: a connection to the
//! other tree is only attempted when a new node was actually inserted.
//!
//! References:
//! - LaSalle et al., "Bang-Bang RRT", 2023. <https://arxiv.org/pdf/2210.01744.pdf>
//! - Hauser et al., "Optimal shortcuts", 2010.

use std::f64::consts::PI;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use rand::Rng;

use crate::common::{
    spatial_distance, states_equal, CollisionOracle, Control, Dynamics, Path, PlannerError,
    PlannerResult, ShootingSolver, State, Visualizable,
};
use crate::utils::{colors, PathStyle, PointStyle, Visualizer};

use super::events::{EventSink, PlannerEvent, RejectReason, TreeSlot};
use super::shooting::{double_integrator, rk4};
use super::steering::bang_bang_steer;
use super::time_optimal::t_optimal;
use super::tree::{NearNode, Node, NodeId, Tree};

/// Tolerance for recognising the tree rooted at the initial state.
const SAME_STATE: f64 = 1e-4;
/// Tolerance for the junction states handed to `generate_path`.
const JUNCTION_TOLERANCE: f64 = 1e-3;
/// Rewire candidates this close to the new node are duplicates of it.
const DUPLICATE_TOLERANCE: f64 = 0.01;

/// How `step()` proposes new nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingStrategy {
    /// Uniform state sample, steered to with bang-bang control
    Uniform,
    /// Random control applied for a random time from a random tree node
    Explore,
}

/// Configuration for the kinodynamic RRT* planner
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Acceleration bound per axis
    pub u_max: f64,
    /// Longest forward simulation of an exploratory sample
    pub dt: f64,
    /// Near-radius growth parameter, must be >= 1.0
    pub gamma: f64,
    /// Euclidean radius of the near-node prefilter
    pub radius: f64,
    /// Nodes with this many children are skipped by exploration (mostly)
    pub max_children: usize,
    /// Probability of branching from a node that already has enough children
    pub bushiness: f64,
    /// Minimum spatial separation between an exploratory sample and the tree
    pub buffer: f64,
    /// Try to link the two trees after each insertion, then swap them
    pub bidirectional: bool,
    pub sampling: SamplingStrategy,
    /// Recompute the radius from `gamma` and the step number
    pub shrinking_radius: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            u_max: 2.5,
            dt: 0.6,
            gamma: 1.0,
            radius: 3.0,
            max_children: 1,
            bushiness: 0.2,
            buffer: 0.3,
            bidirectional: false,
            sampling: SamplingStrategy::Uniform,
            shrinking_radius: false,
        }
    }
}

/// Candidate edge: `target` becomes a child of `source` with cost `cost`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub source: NodeId,
    pub target: State,
    pub cost: f64,
}

fn slot_index(slot: TreeSlot) -> usize {
    match slot {
        TreeSlot::A => 0,
        TreeSlot::B => 1,
    }
}

fn index_slot(index: usize) -> TreeSlot {
    if index == 0 {
        TreeSlot::A
    } else {
        TreeSlot::B
    }
}

/// RRT* shrinking-ball radius for a 4-D state space.
pub fn shrinking_radius(gamma: f64, step_no: usize) -> f64 {
    let n = (step_no + 1) as f64;
    gamma * (n.ln() / n).powf(0.25)
}

/// Kinodynamic RRT* planner.
///
/// Call [KinodynamicRRTStar::step] repeatedly; the caller owns the iteration
/// or time budget. The best path found so far is available at any time.
pub struct KinodynamicRRTStar<C, S, R>
where
    C: CollisionOracle,
    S: ShootingSolver,
    R: Rng,
{
    model: C,
    solver: S,
    rng: R,
    config: PlannerConfig,
    dynamics: Dynamics,
    initial: State,
    goal: State,
    /// Slot 0 is tree A (from the initial state), slot 1 is tree B (from the goal)
    trees: [Tree; 2],
    /// Slot of the tree grown by the next step
    active: usize,
    step_no: usize,
    radius: f64,
    sigma_best: Option<Path>,
    sink: Option<Box<dyn EventSink>>,
}

impl<C, S, R> KinodynamicRRTStar<C, S, R>
where
    C: CollisionOracle,
    S: ShootingSolver,
    R: Rng,
{
    /// Create a planner with tree A rooted at `initial` and tree B at `goal`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `gamma < 1.0` or any other setting is out of range.
    pub fn new(
        model: C,
        solver: S,
        rng: R,
        initial: State,
        goal: State,
        config: PlannerConfig,
    ) -> PlannerResult<Self> {
        if config.gamma < 1.0 {
            return Err(PlannerError::InvalidParameter(
                "invalid gamma, must be >= 1.0".to_string(),
            ));
        }
        if !(config.u_max > 0.0) {
            return Err(PlannerError::InvalidParameter("u_max must be positive".to_string()));
        }
        if !(config.dt > 0.0) {
            return Err(PlannerError::InvalidParameter("dt must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&config.bushiness) {
            return Err(PlannerError::InvalidParameter(
                "bushiness must be a probability".to_string(),
            ));
        }
        if config.buffer < 0.0 || config.radius < 0.0 {
            return Err(PlannerError::InvalidParameter(
                "buffer and radius must be non-negative".to_string(),
            ));
        }
        let radius = config.radius;
        Ok(Self {
            model,
            solver,
            rng,
            config,
            dynamics: double_integrator,
            initial,
            goal,
            trees: [Tree::new(initial), Tree::new(goal)],
            active: 0,
            step_no: 0,
            radius,
            sigma_best: None,
            sink: None,
        })
    }

    /// Receive planner events from now on.
    pub fn set_event_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sink = Some(sink);
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn initial(&self) -> &State {
        &self.initial
    }

    pub fn goal(&self) -> &State {
        &self.goal
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }

    pub fn step_no(&self) -> usize {
        self.step_no
    }

    /// Set the step counter; with a shrinking radius this also sets the radius.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `step_no < 1`.
    pub fn set_step_no(&mut self, step_no: usize) -> PlannerResult<()> {
        if step_no < 1 {
            return Err(PlannerError::InvalidParameter("step number must be >= 1".to_string()));
        }
        self.step_no = step_no;
        if self.config.shrinking_radius {
            self.radius = shrinking_radius(self.config.gamma, step_no);
        }
        Ok(())
    }

    pub fn tree(&self, slot: TreeSlot) -> &Tree {
        &self.trees[slot_index(slot)]
    }

    /// Tree grown from the initial state
    pub fn tree_a(&self) -> &Tree {
        self.tree(TreeSlot::A)
    }

    /// Tree grown from the goal state
    pub fn tree_b(&self) -> &Tree {
        self.tree(TreeSlot::B)
    }

    pub fn nodes_a(&self) -> &[Node] {
        self.tree_a().nodes()
    }

    pub fn nodes_b(&self) -> &[Node] {
        self.tree_b().nodes()
    }

    /// Slot of the tree the next step will grow
    pub fn active_slot(&self) -> TreeSlot {
        index_slot(self.active)
    }

    pub fn best_path(&self) -> Option<&Path> {
        self.sigma_best.as_ref()
    }

    fn emit(&mut self, event: PlannerEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink.record(&event);
        }
    }

    /// Grow the active tree by one node.
    ///
    /// Returns the number of edges inserted: 0 if the sample could not be
    /// connected, 1 for a new node, 2 when the trees were also linked.
    ///
    /// # Errors
    ///
    /// Only invariant violations: a failed coordinated-time solve or a cycle
    /// while extracting a path.
    pub fn step(&mut self) -> PlannerResult<usize> {
        let step_no = self.step_no + 1;
        self.set_step_no(step_no)?;

        let root = self.trees[self.active].root_state();
        let time_forward = states_equal(root, &self.initial, SAME_STATE);
        self.emit(PlannerEvent::StepStarted { step: step_no, time_forward });

        let link = match self.config.sampling {
            SamplingStrategy::Uniform => match self.steer_to_sample(time_forward)? {
                Some(link) => link,
                None => return Ok(0),
            },
            SamplingStrategy::Explore => self.sample_free(time_forward),
        };

        let new_node = self.insert_node(&link, self.active_slot())?;
        let mut edges = 1;

        if self.config.bidirectional {
            edges += self.connect(new_node, time_forward)?;
            self.swap_trees();
        }
        Ok(edges)
    }

    /// Exchange the roles of the active and inactive trees.
    pub fn swap_trees(&mut self) {
        self.active = 1 - self.active;
        self.emit(PlannerEvent::TreesSwapped);
    }

    /// Sample a uniformly random free state, resampling until one is clear.
    pub fn sample_state(&mut self) -> State {
        let (min, max) = self.model.bounds();
        loop {
            let mut state = State::zeros();
            for k in 0..4 {
                state[k] = self.rng.gen_range(min[k]..=max[k]);
            }
            if self.model.clear(&state) {
                return state;
            }
        }
    }

    fn steer_to_sample(&mut self, time_forward: bool) -> PlannerResult<Option<Link>> {
        let x_rand = self.sample_state();
        let found = self.bang_bang_nearest(&x_rand, self.active_slot(), time_forward)?;
        let (nearest, _) = match found {
            Some(found) => found,
            None => {
                self.emit(PlannerEvent::NoNearest { sample: x_rand });
                return Ok(None);
            }
        };
        let x_nearest = *self.trees[self.active].state(nearest)?;

        let model = &self.model;
        let u_max = self.config.u_max;
        let phi = bang_bang_steer(|s| model.clear(s), &x_nearest, &x_rand, time_forward, u_max)?;
        match phi {
            Some(trajectory) => Ok(Some(Link {
                source: nearest,
                target: x_rand,
                cost: trajectory.total_time(),
            })),
            None => {
                self.emit(PlannerEvent::SteerFailed { from: x_nearest, to: x_rand });
                Ok(None)
            }
        }
    }

    /// Add `link.target` to the tree in `slot` as a child of `link.source`.
    pub fn insert_node(&mut self, link: &Link, slot: TreeSlot) -> PlannerResult<NodeId> {
        let node = self.trees[slot_index(slot)].insert(link.source, link.target, link.cost)?;
        self.emit(PlannerEvent::NodeInserted { tree: slot, node, cost: link.cost });
        Ok(node)
    }

    /// Nodes of the tree in `slot` within the Euclidean radius, nearest first.
    ///
    /// In a non-Euclidean space these are not necessarily the truly nearest.
    pub fn near(&self, x_new: &State, slot: TreeSlot) -> Vec<NearNode> {
        self.tree(slot).near_nodes(x_new, self.radius)
    }

    /// First member of `x_near`, nearest first, with a collision-free
    /// straight link to `x_new`.
    pub fn choose_parent(
        &self,
        x_near: &[NearNode],
        slot: TreeSlot,
        x_new: &State,
    ) -> Option<NodeId> {
        let tree = self.tree(slot);
        x_near
            .iter()
            .sorted_by_key(|n| (OrderedFloat(n.distance), n.id))
            .find(|n| tree.state(n.id).map_or(false, |s| self.model.link(s, x_new)))
            .map(|n| n.id)
    }

    /// Node with the smallest coordinated optimal time among the near nodes.
    ///
    /// Candidates come from the Euclidean radius and are rescored with
    /// `t_optimal(x, node)` forward, or `t_optimal(node, x)` time-reversed.
    /// Returns the node and its time, or `None` if nothing is in range.
    pub fn bang_bang_nearest(
        &self,
        x: &State,
        slot: TreeSlot,
        time_forward: bool,
    ) -> PlannerResult<Option<(NodeId, f64)>> {
        let tree = self.tree(slot);
        let mut best: Option<(NodeId, f64)> = None;
        for candidate in self.near(x, slot) {
            let state = tree.state(candidate.id)?;
            let t = if time_forward {
                t_optimal(x, state, self.config.u_max)?
            } else {
                t_optimal(state, x, self.config.u_max)?
            };
            if best.map_or(true, |(_, t_min)| t < t_min) {
                best = Some((candidate.id, t));
            }
        }
        Ok(best)
    }

    /// Look for a link from `new_node` into the inactive tree.
    ///
    /// Near nodes of the inactive tree are tried in [Self::choose_parent]
    /// order, so a node whose straight link is blocked is never a target.
    /// On the first success the linked state is added to the active tree,
    /// its neighbourhood is rewired through it, and the resulting path is
    /// offered as the new best.
    fn connect(&mut self, new_node: NodeId, time_forward: bool) -> PlannerResult<usize> {
        let active = self.active_slot();
        let inactive = index_slot(1 - self.active);
        let x1 = *self.trees[self.active].state(new_node)?;

        let mut x_near = self.near(&x1, inactive);
        while let Some(target) = self.choose_parent(&x_near, inactive, &x1) {
            x_near.retain(|n| n.id != target);
            let x2 = *self.tree(inactive).state(target)?;
            let sol = match self.solver.solve(self.dynamics, &x1, &x2, time_forward) {
                Some(sol) => sol,
                None => continue,
            };
            self.emit(PlannerEvent::Linked { from: x1, to: x2, dt: sol.dt });

            let link = Link {
                source: new_node,
                target: x2,
                cost: sol.dt.abs(),
            };
            let junction = self.insert_node(&link, active)?;
            let around_junction = self.near(&x2, active);
            self.rewire(&around_junction, junction, active, time_forward)?;

            let path = match active {
                TreeSlot::A => self.generate_path(junction, target)?,
                TreeSlot::B => self.generate_path(target, junction)?,
            };
            self.offer_path(path);
            return Ok(1);
        }
        Ok(0)
    }

    fn offer_path(&mut self, path: Path) {
        let previous = self.sigma_best.as_ref().map(|p| p.distance);
        if previous.map_or(true, |d| path.distance < d) {
            self.emit(PlannerEvent::BestPathImproved { distance: path.distance, previous });
            self.sigma_best = Some(path);
        }
    }

    /// Reparent members of `x_near` under `new_node` where that is cheaper.
    ///
    /// Candidates are visited far to near. The root and duplicates of
    /// `new_node` are skipped; connections come from the shooting solver.
    /// Returns the number of rewired nodes.
    pub fn rewire(
        &mut self,
        x_near: &[NearNode],
        new_node: NodeId,
        slot: TreeSlot,
        time_forward: bool,
    ) -> PlannerResult<usize> {
        let index = slot_index(slot);
        let x1 = *self.trees[index].state(new_node)?;
        let mut rewired = 0;
        for candidate in x_near.iter().rev() {
            let node = self.trees[index].get(candidate.id)?;
            if node.incoming().is_none() {
                continue;
            }
            let x2 = *node.state();
            if states_equal(&x1, &x2, DUPLICATE_TOLERANCE) {
                continue;
            }
            let sol = match self.solver.solve(self.dynamics, &x1, &x2, time_forward) {
                Some(sol) => sol,
                None => continue,
            };
            let cost = sol.dt.abs();
            if self.trees[index].rewire(new_node, candidate.id, cost)? {
                rewired += 1;
                self.emit(PlannerEvent::Rewired { tree: slot, node: candidate.id, cost });
            }
        }
        Ok(rewired)
    }

    /// Path from the root of the tree in `slot` to `node`.
    pub fn walk_parents(&self, slot: TreeSlot, node: NodeId) -> PlannerResult<Path> {
        self.tree(slot).walk_parents(node)
    }

    /// Join tree A at `node_a` with tree B at `node_b`.
    ///
    /// Both nodes must hold the same state. The result runs from the initial
    /// state through the junction to the goal, with the junction listed once.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the junction states differ.
    pub fn generate_path(&self, node_a: NodeId, node_b: NodeId) -> PlannerResult<Path> {
        let x_1 = self.tree_a().state(node_a)?;
        let x_2 = self.tree_b().state(node_b)?;
        if !states_equal(x_1, x_2, JUNCTION_TOLERANCE) {
            return Err(PlannerError::InvalidParameter(format!(
                "x1 {:?} != x2 {:?}",
                x_1.as_slice(),
                x_2.as_slice()
            )));
        }
        let p_1 = self.tree_a().walk_parents(node_a)?;
        let p_2 = self.tree_b().walk_parents(node_b)?;
        let mut states = p_1.states;
        // the junction is already the last state of p_1
        states.extend(p_2.states.into_iter().rev().skip(1));
        Ok(Path::new(p_1.distance + p_2.distance, states))
    }

    /// Apply random control to a random node of the active tree.
    ///
    /// Nodes that already have `max_children` children are usually skipped,
    /// which persuades the tree to grow longer. If the node has a parent the
    /// new state must continue in roughly the same direction and keep
    /// `buffer` spatial distance from the rest of the tree.
    pub fn sample_free(&mut self, time_forward: bool) -> Link {
        let (min, max) = self.model.bounds();
        loop {
            match self.try_sample_free(time_forward, &min, &max) {
                Ok(link) => return link,
                Err(reason) => self.emit(PlannerEvent::SampleRejected { reason }),
            }
        }
    }

    fn try_sample_free(
        &mut self,
        time_forward: bool,
        min: &State,
        max: &State,
    ) -> Result<Link, RejectReason> {
        let tree = &self.trees[self.active];
        let source = NodeId(self.rng.gen_range(0..tree.len()));
        let node = &tree.nodes()[source.0];

        if node.outgoing_count() >= self.config.max_children
            && self.rng.gen::<f64>() > self.config.bushiness
        {
            return Err(RejectReason::Crowded);
        }

        let x_nearest = *node.state();
        let azimuth = 2.0 * PI * self.rng.gen::<f64>();
        let u = Control::new(self.config.u_max * azimuth.cos(), self.config.u_max * azimuth.sin());
        let mut dt = self.config.dt * self.rng.gen::<f64>();
        if !time_forward {
            dt = -dt;
        }
        let x_new = rk4(self.dynamics, &x_nearest, &u, dt);

        if (0..4).any(|k| x_new[k] < min[k] || x_new[k] > max[k]) {
            return Err(RejectReason::OutOfBounds);
        }

        if let Some(incoming) = node.incoming() {
            // keep going the way the incoming edge went, to avoid clumping
            let parent = tree.nodes()[incoming.source.0].state();
            let incoming_dx = x_nearest - parent;
            let dx_new = x_new - x_nearest;
            if incoming_dx.dot(&dx_new) < 0.0 {
                return Err(RejectReason::Reversal);
            }
            // spatial dimensions only; many nodes may share a velocity
            if let Some(n) = tree.nearest_euclidean(&x_new) {
                if spatial_distance(&x_new, tree.nodes()[n.id.0].state()) < self.config.buffer {
                    return Err(RejectReason::TooClose);
                }
            }
        }

        if !self.model.clear(&x_new) {
            return Err(RejectReason::NotClear);
        }
        Ok(Link {
            source,
            target: x_new,
            cost: dt.abs(),
        })
    }
}

impl<C, S, R> Visualizable for KinodynamicRRTStar<C, S, R>
where
    C: CollisionOracle,
    S: ShootingSolver,
    R: Rng,
{
    fn visualize(&self, vis: &mut Visualizer) {
        let style_a = PathStyle::new(colors::TREE_A, "Tree A").with_line_width(0.5);
        let style_b = PathStyle::new(colors::TREE_B, "Tree B").with_line_width(0.5);
        vis.plot_segments(&self.tree_a().segments(), &style_a);
        vis.plot_segments(&self.tree_b().segments(), &style_b);
        if let Some(path) = self.best_path() {
            vis.plot_path(path, &PathStyle::default());
        }
        vis.plot_state(&self.initial, &PointStyle::new(colors::START, "Start").with_size(1.5));
        vis.plot_state(&self.goal, &PointStyle::new(colors::GOAL, "Goal").with_size(1.5));
    }
}
