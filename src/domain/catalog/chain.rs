use serde::{Deserialize, Serialize};

use crate::domain::ids::{ChainId, ServiceId, VmId};

/// One position in a chain: the service template it needs, and — once
/// the external agent has proposed a placement and the orchestrator has
/// embedded it — the vm instance realizing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSlot {
    pub service: ServiceId,
    pub vm: Option<VmId>,
}

impl ChainSlot {
    pub fn unembedded(service: ServiceId) -> Self {
        Self { service, vm: None }
    }
}

/// Ordered, finite pipeline of network functions a user's traffic must
/// traverse. `len(slots) >= 1` and slot order is stable for the lifetime
/// of the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    pub id: ChainId,
    pub title: String,
    pub slots: Vec<ChainSlot>,
    pub sla: f64,
    pub time_to_live: f64,
}

impl Chain {
    pub fn is_embedded(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(|s| s.vm.is_some())
    }

    pub fn vms(&self) -> impl Iterator<Item = VmId> + '_ {
        self.slots.iter().filter_map(|s| s.vm)
    }
}
