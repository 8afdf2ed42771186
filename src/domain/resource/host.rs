use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::ids::{HostId, VmId};
use crate::domain::resource::service::Service;
use crate::error::{Error, HostDimension, Result};

/// Physical compute node. Capacity accounting lives entirely here;
/// `0 <= used <= cap` on every dimension is the invariant every public
/// method must preserve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    pub name: String,

    pub cpu_cap: f64,
    pub ram_cap: f64,
    pub storage_cap: f64,

    pub cpu_used: f64,
    pub ram_used: f64,
    pub storage_used: f64,

    /// Clock speed used by `sample_energy`, in Hz.
    pub cpu_frequency_hz: f64,
    pub cycles_per_sample: f64,
    pub effective_capacitance: f64,
    pub bits_overhead: f64,

    /// Resident services, keyed by the VM instance that reserved them.
    /// Keying by vm (rather than by the shared `Service` template id)
    /// keeps kill_service symmetric even when several VMs on the same
    /// host run the same service flavor.
    running: HashMap<VmId, Service>,
}

impl Host {
    pub fn new(
        id: HostId,
        name: impl Into<String>,
        cpu_cap: f64,
        ram_cap: f64,
        storage_cap: f64,
        cpu_frequency_hz: f64,
        cycles_per_sample: f64,
        effective_capacitance: f64,
        bits_overhead: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            cpu_cap,
            ram_cap,
            storage_cap,
            cpu_used: 0.0,
            ram_used: 0.0,
            storage_used: 0.0,
            cpu_frequency_hz,
            cycles_per_sample,
            effective_capacitance,
            bits_overhead,
            running: HashMap::new(),
        }
    }

    pub fn can_host(&self, service: &Service) -> bool {
        self.cpu_used + service.cpu_req <= self.cpu_cap
            && self.ram_used + service.ram_req <= self.ram_cap
            && self.storage_used + service.storage_req <= self.storage_cap
    }

    /// Reserves `service`'s requirements on this host for `vm`.
    pub fn instantiate_service(&mut self, vm: VmId, service: Service) -> Result<()> {
        if self.cpu_used + service.cpu_req > self.cpu_cap {
            return Err(Error::CapacityExceeded { dim: HostDimension::Cpu, host: self.id });
        }
        if self.ram_used + service.ram_req > self.ram_cap {
            return Err(Error::CapacityExceeded { dim: HostDimension::Ram, host: self.id });
        }
        if self.storage_used + service.storage_req > self.storage_cap {
            return Err(Error::CapacityExceeded { dim: HostDimension::Storage, host: self.id });
        }

        self.cpu_used += service.cpu_req;
        self.ram_used += service.ram_req;
        self.storage_used += service.storage_req;
        log::debug!("host {}: reserved service {} for vm {}", self.id, service.name, vm);
        self.running.insert(vm, service);

        Ok(())
    }

    /// Releases the service reserved for `vm`, returning the template so
    /// the caller (the catalog) can still inspect what was freed.
    pub fn kill_service(&mut self, vm: VmId) -> Result<Service> {
        let service = self.running.remove(&vm).ok_or(Error::NotResident { vm, host: self.id })?;

        // Clamp rather than let `used` drift below zero; a caller handing
        // back a reservation that doesn't match what was recorded would
        // otherwise silently corrupt the invariant (the historical bug
        // this guards against: unchecked free_resources on the host).
        self.cpu_used = (self.cpu_used - service.cpu_req).max(0.0);
        self.ram_used = (self.ram_used - service.ram_req).max(0.0);
        self.storage_used = (self.storage_used - service.storage_req).max(0.0);

        log::debug!("host {}: released service {} for vm {}", self.id, service.name, vm);
        Ok(service)
    }

    pub fn is_resident(&self, vm: VmId) -> bool {
        self.running.contains_key(&vm)
    }

    /// Instantaneous power draw, derived purely from current utilization;
    /// never mutates state.
    pub fn sample_energy(&self) -> f64 {
        self.cpu_used * self.effective_capacitance * self.cycles_per_sample * self.bits_overhead * self.cpu_frequency_hz.powi(2)
    }
}
