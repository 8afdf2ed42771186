//! Per-hop shortest-path routing with suspend/retry admission.
//!
//! A chain's waypoints are `[user, host(vm_1), host(vm_2), ..., host(vm_k)]`.
//! Each consecutive pair is routed independently with Dijkstra; if the
//! cheapest path for a hop crosses a link that cannot carry the requested
//! bandwidth, that link's edge is pulled out of the graph and the hop is
//! retried from scratch. Every edge removed this way — across every hop —
//! is put back before `route` returns, whether routing ultimately
//! succeeded or ran out of paths.

use crate::domain::graph::EdgeAttrs;
use crate::domain::ids::GraphNode;
use crate::domain::substrate::Substrate;
use crate::error::{Error, Result};

pub struct Router;

impl Router {
    /// Finds a full path through every waypoint that can carry `amount`
    /// of bandwidth on each physical hop, suspending saturated links as
    /// needed. Does not reserve anything — callers reserve against the
    /// returned path's links themselves.
    pub fn route(substrate: &Substrate, waypoints: &[GraphNode], amount: f64) -> Result<Vec<GraphNode>> {
        let mut suspended: Vec<(GraphNode, GraphNode, EdgeAttrs)> = Vec::new();
        let result = Self::route_inner(substrate, waypoints, amount, &mut suspended);
        for (a, b, attrs) in suspended {
            substrate.restore_edge(a, b, attrs);
        }
        result
    }

    fn route_inner(substrate: &Substrate, waypoints: &[GraphNode], amount: f64, suspended: &mut Vec<(GraphNode, GraphNode, EdgeAttrs)>) -> Result<Vec<GraphNode>> {
        if waypoints.len() < 2 {
            return Ok(waypoints.to_vec());
        }

        let mut full_path = vec![waypoints[0]];
        for pair in waypoints.windows(2) {
            let hop = Self::route_hop(substrate, pair[0], pair[1], amount, suspended)?;
            full_path.extend(hop.into_iter().skip(1));
        }
        Ok(full_path)
    }

    fn route_hop(
        substrate: &Substrate,
        src: GraphNode,
        dst: GraphNode,
        amount: f64,
        suspended: &mut Vec<(GraphNode, GraphNode, EdgeAttrs)>,
    ) -> Result<Vec<GraphNode>> {
        loop {
            let path = substrate.shortest_path(src, dst).ok_or(Error::NoRouteAvailable)?;
            match Self::first_saturated_edge(substrate, &path, amount) {
                None => return Ok(path),
                Some((a, b)) => {
                    if let Some(attrs) = substrate.suspend_edge(a, b) {
                        suspended.push((a, b, attrs));
                    }
                }
            }
        }
    }

    fn first_saturated_edge(substrate: &Substrate, path: &[GraphNode], amount: f64) -> Option<(GraphNode, GraphNode)> {
        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let attrs = substrate.edge_between(a, b)?;
            let Some(link_id) = attrs.link_id else {
                continue;
            };
            let residual = substrate.residual_bandwidth(link_id).unwrap_or(0.0);
            // bandwidth_after = residual - amount; suspend at <= 0, not just < 0,
            // per the original's `if bandwidthAfter <= 0`.
            if residual <= amount {
                return Some((a, b));
            }
        }
        None
    }
}
