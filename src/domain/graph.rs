//! The topology graph: the single source of truth for routing.
//!
//! Edges only ever carry a physical link's id plus its (immutable) delay
//! weight — bandwidth itself is never duplicated here, it lives solely on
//! the `Link` resource primitive. This sidesteps the graph/primitive
//! duplication problem the design notes call out: there is nothing to
//! keep in sync because residual bandwidth is looked up live through the
//! `Substrate` whenever the router needs it.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use crate::domain::ids::{GraphNode, LinkId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeAttrs {
    /// `Some` for a physical host-to-host link; `None` for the "virtual"
    /// zero-bandwidth pin edges that attach a VM to its host or a user to
    /// the graph (kept for the `graph_nodes ⊇ hosts ∪ VMs ∪ users`
    /// invariant and for snapshot/visualization consumers; routing never
    /// targets a VM node directly, so these are never weighed).
    pub link_id: Option<LinkId>,
    pub delay_ms: f64,
}

impl EdgeAttrs {
    pub fn physical(link_id: LinkId, delay_ms: f64) -> Self {
        Self { link_id: Some(link_id), delay_ms }
    }

    pub fn pin() -> Self {
        Self { link_id: None, delay_ms: 0.0 }
    }
}

#[derive(Debug, Default, Clone)]
pub struct TopologyGraph {
    adjacency: HashMap<GraphNode, BTreeMap<GraphNode, EdgeAttrs>>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: GraphNode) {
        self.adjacency.entry(node).or_default();
    }

    pub fn remove_node(&mut self, node: GraphNode) {
        if let Some(neighbors) = self.adjacency.remove(&node) {
            for neighbor in neighbors.keys() {
                if let Some(n) = self.adjacency.get_mut(neighbor) {
                    n.remove(&node);
                }
            }
        }
    }

    pub fn contains_node(&self, node: GraphNode) -> bool {
        self.adjacency.contains_key(&node)
    }

    pub fn add_edge(&mut self, a: GraphNode, b: GraphNode, attrs: EdgeAttrs) {
        self.adjacency.entry(a).or_default().insert(b, attrs);
        self.adjacency.entry(b).or_default().insert(a, attrs);
    }

    /// Removes the edge between `a` and `b`, returning its attributes so
    /// the caller (the router's suspend step) can restore it verbatim.
    pub fn remove_edge(&mut self, a: GraphNode, b: GraphNode) -> Option<EdgeAttrs> {
        let attrs = self.adjacency.get_mut(&a).and_then(|n| n.remove(&b));
        self.adjacency.get_mut(&b).and_then(|n| n.remove(&a));
        attrs
    }

    pub fn edge(&self, a: GraphNode, b: GraphNode) -> Option<EdgeAttrs> {
        self.adjacency.get(&a).and_then(|n| n.get(&b)).copied()
    }

    /// Neighbors in a fixed, deterministic order (ascending `GraphNode`),
    /// so Dijkstra runs reproducibly given identical topology state.
    pub fn neighbors(&self, node: GraphNode) -> impl Iterator<Item = (GraphNode, EdgeAttrs)> + '_ {
        self.adjacency.get(&node).into_iter().flat_map(|n| n.iter().map(|(k, v)| (*k, *v)))
    }

    pub fn nodes(&self) -> impl Iterator<Item = GraphNode> + '_ {
        self.adjacency.keys().copied()
    }

    /// Dijkstra shortest path from `src` to `dst`, weighted by `delay_ms`.
    /// Returns `None` when no path exists. Ties between equal-cost
    /// frontier entries are broken by `GraphNode`'s total order, making
    /// runs reproducible for identical topology state.
    pub fn shortest_path(&self, src: GraphNode, dst: GraphNode) -> Option<Vec<GraphNode>> {
        if src == dst {
            return Some(vec![src]);
        }
        if !self.adjacency.contains_key(&src) || !self.adjacency.contains_key(&dst) {
            return None;
        }

        let mut dist: HashMap<GraphNode, f64> = HashMap::new();
        let mut prev: HashMap<GraphNode, GraphNode> = HashMap::new();
        let mut visited: HashSet<GraphNode> = HashSet::new();
        let mut heap: BinaryHeap<Reverse<(OrderedDelay, GraphNode)>> = BinaryHeap::new();

        dist.insert(src, 0.0);
        heap.push(Reverse((OrderedDelay(0.0), src)));

        while let Some(Reverse((OrderedDelay(cost), node))) = heap.pop() {
            if !visited.insert(node) {
                continue;
            }
            if node == dst {
                break;
            }

            for (neighbor, attrs) in self.neighbors(node) {
                if visited.contains(&neighbor) {
                    continue;
                }
                let next_cost = cost + attrs.delay_ms;
                let better = match dist.get(&neighbor) {
                    Some(&current) => next_cost < current,
                    None => true,
                };
                if better {
                    dist.insert(neighbor, next_cost);
                    prev.insert(neighbor, node);
                    heap.push(Reverse((OrderedDelay(next_cost), neighbor)));
                }
            }
        }

        if !dist.contains_key(&dst) {
            return None;
        }

        let mut path = vec![dst];
        let mut current = dst;
        while let Some(&p) = prev.get(&current) {
            path.push(p);
            current = p;
        }
        path.reverse();
        Some(path)
    }
}

/// Wraps `f64` so it can sit in a `BinaryHeap`/`Ord` context. Delay values
/// in this domain are always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedDelay(f64);

impl Eq for OrderedDelay {}
impl PartialOrd for OrderedDelay {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OrderedDelay {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
    }
}
