use serde::{Deserialize, Serialize};

use crate::domain::ids::{ConnectionId, GraphNode, UserId};

/// A routed, reserved path a user's chain traffic currently flows over.
/// `node_path` is the full concatenation of every per-hop shortest path
/// between consecutive waypoints (user, then each vm's host in order),
/// with shared waypoint nodes de-duplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub user: UserId,
    pub node_path: Vec<GraphNode>,
    pub bandwidth: f64,
}

impl Connection {
    pub fn new(id: ConnectionId, user: UserId, node_path: Vec<GraphNode>, bandwidth: f64) -> Self {
        Self { id, user, node_path, bandwidth }
    }
}
