//! The agent-facing facade: `poll`, `embed`, `step`, plus the
//! sentinel-emitting wrappers the design notes call for — proper
//! `Result`s everywhere internally, sentinels only at this boundary.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use crate::api::dto::SubstrateSnapshot;
use crate::config::SimulatorConfig;
use crate::domain::catalog::{Catalog, Chain};
use crate::domain::clock::Clock;
use crate::domain::connection::Connection;
use crate::domain::ids::{ChainId, ConnectionId, GuidCounter, HostId};
use crate::domain::orchestrator::Orchestrator;
use crate::domain::substrate::Substrate;
use crate::error::Result;
use crate::event_log::{EventLog, EventRecord};

pub const SENTINEL_DENIED: f64 = 99999.0;

/// `Environment` ties the substrate, catalog, orchestrator, and clock
/// together behind the three operations an external placement agent
/// needs. Chain requests are produced by whatever traffic generator the
/// host program wires in — out of scope here — and handed to the
/// environment through `submit_chain`, where `poll` picks them up.
#[derive(Debug, Clone)]
pub struct Environment {
    substrate: Substrate,
    catalog: Catalog,
    orchestrator: Orchestrator,
    clock: Clock,
    pending: Arc<RwLock<VecDeque<ChainId>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::with_config(SimulatorConfig::default())
    }

    pub fn with_config(config: SimulatorConfig) -> Self {
        let guids = Arc::new(GuidCounter::new());
        let substrate = Substrate::new(guids.clone());
        let catalog = Catalog::new(guids.clone());
        let clock = Clock::new();
        let events = Arc::new(EventLog::new(config.event_log_capacity));
        let orchestrator = Orchestrator::new(guids, substrate.clone(), catalog.clone(), clock.clone(), events);
        Self { substrate, catalog, orchestrator, clock, pending: Arc::new(RwLock::new(VecDeque::new())) }
    }

    pub fn substrate(&self) -> &Substrate {
        &self.substrate
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    /// Queues `chain_id` as a pending request; the next `poll` will
    /// surface it to the agent.
    pub fn submit_chain(&self, chain_id: ChainId) {
        self.pending.write().unwrap().push_back(chain_id);
    }

    /// Returns a substrate snapshot alongside the next pending, unembedded
    /// chain request, or `None` if nothing is queued.
    pub fn poll(&self) -> Option<(SubstrateSnapshot, Chain)> {
        let chain_id = self.pending.write().unwrap().pop_front()?;
        let chain = self.catalog.get_chain(chain_id).ok()?;
        let snapshot = SubstrateSnapshot::capture(&self.substrate, &self.catalog);
        Some((snapshot, chain))
    }

    /// Embeds `chain_id` at the hosts the agent proposed, one per slot in
    /// order, then starts traffic for every user already waiting on this
    /// chain (a user may be added before or after its chain is embedded).
    /// Mirrors `reserve_path`'s established-list rollback: a failure on
    /// any slot undoes every vm already instantiated by this call, so a
    /// rejected placement never leaves the chain consuming host capacity
    /// it isn't credited with. A `start_traffic` failure for one user does
    /// not roll back placement — other users in the loop may already have
    /// active connections riding these vms, and undoing the placement out
    /// from under them would leak their link reservations instead of
    /// fixing anything; callers see the error and may retry or free the
    /// chain themselves.
    pub fn embed(&self, chain_id: ChainId, placement: &[HostId]) -> Result<()> {
        let mut instantiated = Vec::new();
        for (slot_index, host_id) in placement.iter().enumerate() {
            match self.catalog.instantiate_vm(&self.substrate, chain_id, slot_index, *host_id) {
                Ok(vm_id) => instantiated.push(vm_id),
                Err(e) => {
                    for vm_id in instantiated {
                        let _ = self.catalog.terminate_vm(&self.substrate, vm_id);
                    }
                    return Err(e);
                }
            }
        }

        for user in self.substrate.list_users() {
            if user.chain == chain_id {
                self.orchestrator.start_traffic(user.id)?;
            }
        }
        Ok(())
    }

    /// Advances simulated time by `dt`, expiring any chain past its TTL.
    pub fn step(&self, dt: f64) -> Result<()> {
        self.clock.step(dt, &self.catalog, &self.orchestrator)
    }

    pub fn service_ping(&self, conn_id: ConnectionId) -> f64 {
        self.orchestrator.service_ping(conn_id).unwrap_or(SENTINEL_DENIED)
    }

    pub fn service_data(&self, conn_id: ConnectionId) -> f64 {
        self.orchestrator.service_data(conn_id).unwrap_or(-1.0)
    }

    pub fn service_performance_score(&self, conn_id: ConnectionId) -> f64 {
        self.orchestrator.service_performance_score(conn_id).unwrap_or(0.0)
    }

    pub fn get_connection(&self, conn_id: ConnectionId) -> Result<Connection> {
        self.orchestrator.get_connection(conn_id)
    }

    pub fn drain_events(&self) -> Vec<EventRecord> {
        self.orchestrator.drain_events()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
