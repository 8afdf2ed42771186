use serde::{Deserialize, Serialize};

use crate::domain::ids::ServiceId;

/// Immutable template describing the resource footprint of a network
/// function. `VM`s are runtime instances pinned to a host; the `Service`
/// itself never changes once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub cpu_req: f64,
    pub ram_req: f64,
    pub storage_req: f64,
    pub bandwidth_req: f64,
}

impl Service {
    pub fn new(id: ServiceId, name: impl Into<String>, cpu_req: f64, ram_req: f64, storage_req: f64, bandwidth_req: f64) -> Self {
        Self { id, name: name.into(), cpu_req, ram_req, storage_req, bandwidth_req }
    }
}
