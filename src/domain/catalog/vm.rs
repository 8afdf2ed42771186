use serde::{Deserialize, Serialize};

use crate::domain::ids::{HostId, ServiceId, VmId};

/// A runtime instance of a `Service`, pinned to one `Host`. `host` is the
/// only mutable attribute — migration is a single-field update, resolved
/// through the `Substrate`/`Catalog` rather than an owned pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vm {
    pub id: VmId,
    pub service: ServiceId,
    pub host: HostId,
}

impl Vm {
    pub fn new(id: VmId, service: ServiceId, host: HostId) -> Self {
        Self { id, service, host }
    }
}
