pub mod chain;
pub mod vm;

pub use chain::{Chain, ChainSlot};
pub use vm::Vm;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::ids::{ChainId, GraphNode, GuidCounter, HostId, ServiceId, VmId};
use crate::domain::resource::Service;
use crate::domain::substrate::Substrate;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct CatalogInner {
    services: HashMap<ServiceId, Service>,
    vms: HashMap<VmId, Vm>,
    chains: HashMap<ChainId, Chain>,
}

/// Owns service templates, vm instances, and chain definitions. Unlike
/// `Substrate`, the catalog never touches the topology graph directly —
/// `instantiate_vm`/`terminate_vm` reach into a `Substrate` to reserve
/// host capacity and mutate the graph's pin edges, keeping the graph's
/// single-owner invariant intact.
#[derive(Debug, Clone)]
pub struct Catalog {
    guids: Arc<GuidCounter>,
    inner: Arc<RwLock<CatalogInner>>,
}

impl Catalog {
    pub fn new(guids: Arc<GuidCounter>) -> Self {
        Self { guids, inner: Arc::new(RwLock::new(CatalogInner::default())) }
    }

    pub fn add_service(&self, name: impl Into<String>, cpu_req: f64, ram_req: f64, storage_req: f64, bandwidth_req: f64) -> ServiceId {
        let id: ServiceId = self.guids.alloc();
        let service = Service::new(id, name, cpu_req, ram_req, storage_req, bandwidth_req);
        self.inner.write().unwrap().services.insert(id, service);
        id
    }

    pub fn get_service(&self, service_id: ServiceId) -> Result<Service> {
        self.inner.read().unwrap().services.get(&service_id).cloned().ok_or(Error::ServiceNotFound(service_id))
    }

    pub fn list_services(&self) -> Vec<Service> {
        let inner = self.inner.read().unwrap();
        let mut services: Vec<_> = inner.services.values().cloned().collect();
        services.sort_by_key(|s| s.id);
        services
    }

    /// Creates an unembedded chain request: a fixed sequence of service
    /// slots with no host assignments yet. `time_to_live` is an absolute
    /// simulation-clock deadline, not a duration (see DESIGN.md: the
    /// distilled spec names `ttl` in the wire format but not in this
    /// constructor's parameter list — resolved by taking it here).
    pub fn add_chain(&self, title: impl Into<String>, services: Vec<ServiceId>, sla: f64, time_to_live: f64) -> Result<ChainId> {
        if services.is_empty() {
            return Err(Error::EmptyChain);
        }
        let id: ChainId = self.guids.alloc();
        let chain = Chain { id, title: title.into(), slots: services.into_iter().map(ChainSlot::unembedded).collect(), sla, time_to_live };
        self.inner.write().unwrap().chains.insert(id, chain);
        Ok(id)
    }

    pub fn get_chain(&self, chain_id: ChainId) -> Result<Chain> {
        self.inner.read().unwrap().chains.get(&chain_id).cloned().ok_or(Error::ChainNotFound(chain_id))
    }

    pub fn list_chains(&self) -> Vec<Chain> {
        let inner = self.inner.read().unwrap();
        let mut chains: Vec<_> = inner.chains.values().cloned().collect();
        chains.sort_by_key(|c| c.id);
        chains
    }

    pub fn remove_chain(&self, chain_id: ChainId) -> Result<Chain> {
        self.inner.write().unwrap().chains.remove(&chain_id).ok_or(Error::ChainNotFound(chain_id))
    }

    /// Embeds slot `slot_index` of `chain_id` onto `host`: reserves the
    /// slot's service on the host and records the new vm in both the
    /// catalog and the chain. On `CapacityExceeded` nothing is mutated —
    /// neither the host, nor the graph, nor the chain's slot.
    pub fn instantiate_vm(&self, substrate: &Substrate, chain_id: ChainId, slot_index: usize, host_id: HostId) -> Result<VmId> {
        let service = {
            let inner = self.inner.read().unwrap();
            let chain = inner.chains.get(&chain_id).ok_or(Error::ChainNotFound(chain_id))?;
            let slot = chain.slots.get(slot_index).ok_or(Error::ChainNotFound(chain_id))?;
            inner.services.get(&slot.service).cloned().ok_or(Error::ServiceNotFound(slot.service))?
        };

        let vm_id: VmId = self.guids.alloc();
        substrate.with_host_mut(host_id, |host| host.instantiate_service(vm_id, service.clone()))?;
        substrate.add_vm_pin(GraphNode::Vm(vm_id), host_id);

        let mut inner = self.inner.write().unwrap();
        inner.vms.insert(vm_id, Vm::new(vm_id, service.id, host_id));
        if let Some(chain) = inner.chains.get_mut(&chain_id) {
            if let Some(slot) = chain.slots.get_mut(slot_index) {
                slot.vm = Some(vm_id);
            }
        }

        log::info!("catalog: vm {} instantiated on host {} for chain {} slot {}", vm_id, host_id, chain_id, slot_index);
        Ok(vm_id)
    }

    /// Releases `vm`'s service reservation on its current host and
    /// removes it (and its pin edge) from the graph. The mirror image of
    /// `instantiate_vm`: whichever chain slot still points at `vm_id` is
    /// reset to unembedded, so a terminated vm never leaves a chain
    /// reporting `is_embedded()` against a dangling vm id.
    pub fn terminate_vm(&self, substrate: &Substrate, vm_id: VmId) -> Result<()> {
        let vm = {
            let inner = self.inner.read().unwrap();
            inner.vms.get(&vm_id).cloned().ok_or(Error::VmNotFound(vm_id))?
        };

        substrate.with_host_mut(vm.host, |host| host.kill_service(vm_id).map(|_| ()))?;
        substrate.remove_vm_pin(GraphNode::Vm(vm_id));

        let mut inner = self.inner.write().unwrap();
        inner.vms.remove(&vm_id);
        for chain in inner.chains.values_mut() {
            for slot in chain.slots.iter_mut() {
                if slot.vm == Some(vm_id) {
                    slot.vm = None;
                }
            }
        }
        log::info!("catalog: vm {} terminated", vm_id);
        Ok(())
    }

    pub fn get_vm(&self, vm_id: VmId) -> Result<Vm> {
        self.inner.read().unwrap().vms.get(&vm_id).cloned().ok_or(Error::VmNotFound(vm_id))
    }

    /// Updates the catalog's record of where `vm` lives. Does not touch
    /// the substrate's resource reservations or graph pin edge — the
    /// orchestrator's `migrate_vm` is responsible for sequencing those
    /// alongside this call.
    pub(crate) fn set_vm_host(&self, vm_id: VmId, host_id: HostId) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let vm = inner.vms.get_mut(&vm_id).ok_or(Error::VmNotFound(vm_id))?;
        vm.host = host_id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::substrate::Substrate;
    use std::sync::Arc;

    #[test]
    fn instantiate_then_terminate_releases_host_capacity() {
        let guids = Arc::new(GuidCounter::new());
        let substrate = Substrate::new(guids.clone());
        let catalog = Catalog::new(guids);

        let host = substrate.add_host("h1", 2.0, 2.0, 2.0, 1e9, 1.0, 1e-9, 1.0);
        let service = catalog.add_service("fw", 1.0, 1.0, 1.0, 1.0);
        let chain_id = catalog.add_chain("c", vec![service], 10.0, 100.0).unwrap();

        let vm_id = catalog.instantiate_vm(&substrate, chain_id, 0, host).unwrap();
        assert_eq!(substrate.query_host(host).unwrap().cpu_used, 1.0);
        assert!(catalog.get_chain(chain_id).unwrap().is_embedded());

        catalog.terminate_vm(&substrate, vm_id).unwrap();
        assert_eq!(substrate.query_host(host).unwrap().cpu_used, 0.0);
        assert!(catalog.get_vm(vm_id).is_err());
    }

    #[test]
    fn instantiate_vm_fails_without_capacity_and_mutates_nothing() {
        let guids = Arc::new(GuidCounter::new());
        let substrate = Substrate::new(guids.clone());
        let catalog = Catalog::new(guids);

        let host = substrate.add_host("h1", 0.5, 2.0, 2.0, 1e9, 1.0, 1e-9, 1.0);
        let service = catalog.add_service("fw", 1.0, 1.0, 1.0, 1.0);
        let chain_id = catalog.add_chain("c", vec![service], 10.0, 100.0).unwrap();

        let err = catalog.instantiate_vm(&substrate, chain_id, 0, host).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { .. }));
        assert!(!catalog.get_chain(chain_id).unwrap().is_embedded());
        assert_eq!(substrate.query_host(host).unwrap().cpu_used, 0.0);
    }

    #[test]
    fn add_chain_rejects_an_empty_service_list() {
        let guids = Arc::new(GuidCounter::new());
        let catalog = Catalog::new(guids);
        let err = catalog.add_chain("empty", vec![], 10.0, 100.0).unwrap_err();
        assert!(matches!(err, Error::EmptyChain));
    }
}
