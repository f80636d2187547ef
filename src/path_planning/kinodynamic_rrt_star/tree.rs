//! Arena-backed search tree with a spatial index
//!
//! Nodes live in a vector and are addressed by [NodeId]. Each node stores its
//! incoming edge as a handle to the parent plus the edge cost, so rewiring is
//! a handle reassignment. An R-tree over the 4-D states answers the Euclidean
//! near/nearest queries.

use std::collections::HashSet;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use rstar::primitives::GeomWithData;
use rstar::{PointDistance, RTree};

use crate::common::{Path, PlannerError, PlannerResult, State};

/// Stable handle of a node within its [Tree]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Incoming edge of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: NodeId,
    /// Traversal time, non-negative
    pub cost: f64,
}

/// Tree node
#[derive(Debug, Clone)]
pub struct Node {
    state: State,
    incoming: Option<Edge>,
    outgoing: usize,
}

impl Node {
    fn new(state: State, incoming: Option<Edge>) -> Self {
        Node {
            state,
            incoming,
            outgoing: 0,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Edge from the parent; `None` for the root
    pub fn incoming(&self) -> Option<&Edge> {
        self.incoming.as_ref()
    }

    /// Number of children
    pub fn outgoing_count(&self) -> usize {
        self.outgoing
    }
}

/// Result of a spatial query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearNode {
    pub id: NodeId,
    /// Euclidean distance in the 4-D state space
    pub distance: f64,
}

type IndexEntry = GeomWithData<[f64; 4], NodeId>;

fn point(state: &State) -> [f64; 4] {
    [state[0], state[1], state[2], state[3]]
}

/// Search tree rooted at a single state.
///
/// Invariant: exactly one path from the root to every node.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    index: RTree<IndexEntry>,
}

impl Tree {
    /// Construct a new tree with the specified state as the root node.
    pub fn new(root: State) -> Self {
        let mut index = RTree::new();
        index.insert(IndexEntry::new(point(&root), NodeId(0)));
        Tree {
            nodes: vec![Node::new(root, None)],
            index,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_state(&self) -> &State {
        &self.nodes[0].state
    }

    /// Number of nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds at least its root
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of edges; every non-root node has exactly one
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.incoming.is_some()).count()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Node lookup that reports unknown handles as an error
    pub fn get(&self, id: NodeId) -> PlannerResult<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| PlannerError::PlanningError(format!("unknown node {:?}", id)))
    }

    pub fn state(&self, id: NodeId) -> PlannerResult<&State> {
        self.get(id).map(|n| &n.state)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Add `state` as a new child of `source` with an edge of `cost`.
    ///
    /// # Errors
    ///
    /// If `source` is not in the tree.
    pub fn insert(&mut self, source: NodeId, state: State, cost: f64) -> PlannerResult<NodeId> {
        self.get(source)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(state, Some(Edge { source, cost })));
        self.nodes[source.0].outgoing += 1;
        self.index.insert(IndexEntry::new(point(&state), id));
        Ok(id)
    }

    /// Euclidean-nearest node to `state`
    pub fn nearest_euclidean(&self, state: &State) -> Option<NearNode> {
        let query = point(state);
        self.index.nearest_neighbor(&query).map(|entry| NearNode {
            id: entry.data,
            distance: entry.distance_2(&query).sqrt(),
        })
    }

    /// Visit every node within Euclidean `radius` of `state`.
    pub fn near<F>(&self, state: &State, radius: f64, mut visitor: F)
    where
        F: FnMut(NodeId, f64),
    {
        let query = point(state);
        for entry in self.index.locate_within_distance(query, radius * radius) {
            visitor(entry.data, entry.distance_2(&query).sqrt());
        }
    }

    /// Nodes within Euclidean `radius` of `state`, nearest first.
    pub fn near_nodes(&self, state: &State, radius: f64) -> Vec<NearNode> {
        let mut found = Vec::new();
        self.near(state, radius, |id, distance| found.push(NearNode { id, distance }));
        found
            .into_iter()
            .sorted_by_key(|n| (OrderedFloat(n.distance), n.id))
            .collect()
    }

    /// Whether `ancestor` lies on the path from the root to `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        let mut steps = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            // a corrupted tree must not hang the check
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.nodes.get(id.0).and_then(|n| n.incoming).map(|e| e.source);
        }
        false
    }

    /// `(parent state, child state)` for every edge
    pub fn segments(&self) -> Vec<(State, State)> {
        self.nodes
            .iter()
            .filter_map(|n| n.incoming.map(|e| (self.nodes[e.source.0].state, n.state)))
            .collect()
    }

    /// Total edge cost from the root to `node`.
    pub fn cost_to_root(&self, node: NodeId) -> PlannerResult<f64> {
        self.walk_parents(node).map(|p| p.distance)
    }

    /// Replace the incoming edge of `node` with one from `new_parent`.
    ///
    /// Only applied when it lowers the cost of reaching `node` and cannot
    /// create a cycle. The root is never rewired. Returns whether the edge was
    /// replaced.
    pub fn rewire(&mut self, new_parent: NodeId, node: NodeId, cost: f64) -> PlannerResult<bool> {
        self.get(new_parent)?;
        let old = match self.get(node)?.incoming {
            Some(edge) => edge,
            None => return Ok(false),
        };
        if old.source == new_parent || self.is_ancestor(node, new_parent) {
            return Ok(false);
        }
        let old_cost = self.cost_to_root(node)?;
        let new_cost = self.cost_to_root(new_parent)? + cost;
        if new_cost >= old_cost {
            return Ok(false);
        }
        self.nodes[old.source.0].outgoing -= 1;
        self.nodes[new_parent.0].outgoing += 1;
        self.nodes[node.0].incoming = Some(Edge {
            source: new_parent,
            cost,
        });
        Ok(true)
    }

    /// Walk the parent links from `node` to the root.
    ///
    /// Returns the states from the root to `node` and the accumulated cost.
    ///
    /// # Errors
    ///
    /// `CycleDetected` if a node is visited twice, `PlanningError` for an
    /// unknown handle.
    pub fn walk_parents(&self, node: NodeId) -> PlannerResult<Path> {
        let mut visited = HashSet::new();
        let mut states = Vec::new();
        let mut total_distance = 0.0;
        let mut current = node;
        loop {
            if !visited.insert(current) {
                return Err(PlannerError::CycleDetected(format!(
                    "node {:?} reached twice walking up from {:?}",
                    current, node
                )));
            }
            let n = self.get(current)?;
            states.push(n.state);
            match n.incoming {
                Some(edge) => {
                    total_distance += edge.cost;
                    current = edge.source;
                }
                None => break,
            }
        }
        states.reverse();
        Ok(Path::new(total_distance, states))
    }

    #[cfg(test)]
    pub(crate) fn force_parent(&mut self, node: NodeId, source: NodeId, cost: f64) {
        self.nodes[node.0].incoming = Some(Edge { source, cost });
    }
}
