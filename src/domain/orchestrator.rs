//! Instantiates/terminates/migrates VMs and starts/stops traffic, holding
//! the active-flow table that owns every live `Connection`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::catalog::Catalog;
use crate::domain::clock::Clock;
use crate::domain::connection::Connection;
use crate::domain::ids::{ChainId, ConnectionId, GraphNode, GuidCounter, HostId, UserId, VmId};
use crate::domain::router::Router;
use crate::domain::substrate::Substrate;
use crate::error::{Error, Result};
use crate::event_log::EventLog;

#[derive(Debug, Default)]
struct OrchestratorInner {
    active_flows: HashMap<ConnectionId, Connection>,
}

/// Owns the active-flow table and coordinates the substrate, catalog, and
/// router to realize chain embeddings as live traffic.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    guids: Arc<GuidCounter>,
    substrate: Substrate,
    catalog: Catalog,
    clock: Clock,
    events: Arc<EventLog>,
    inner: Arc<RwLock<OrchestratorInner>>,
}

impl Orchestrator {
    pub fn new(guids: Arc<GuidCounter>, substrate: Substrate, catalog: Catalog, clock: Clock, events: Arc<EventLog>) -> Self {
        Self { guids, substrate, catalog, clock, events, inner: Arc::new(RwLock::new(OrchestratorInner::default())) }
    }

    fn chain_waypoints(&self, user_id: UserId) -> Result<(ChainId, f64, Vec<GraphNode>)> {
        let user = self.substrate.get_user(user_id)?;
        let chain = self.catalog.get_chain(user.chain)?;
        if !chain.is_embedded() {
            return Err(Error::ChainNotEmbedded(chain.id));
        }

        let mut waypoints = vec![GraphNode::User(user_id)];
        for vm_id in chain.vms() {
            let vm = self.catalog.get_vm(vm_id)?;
            waypoints.push(GraphNode::Host(vm.host));
        }
        Ok((chain.id, user.bandwidth, waypoints))
    }

    /// Routes and reserves a path for `user`'s chain traffic. A router
    /// `NoRouteAvailable` is translated to `Denied` here — the only place
    /// that distinction is made, per the admission-vs-failure split in
    /// the error taxonomy.
    pub fn start_traffic(&self, user_id: UserId) -> Result<Connection> {
        let (chain_id, bandwidth, waypoints) = self.chain_waypoints(user_id)?;

        let path = match Router::route(&self.substrate, &waypoints, bandwidth) {
            Ok(path) => path,
            Err(Error::NoRouteAvailable) => {
                self.events.record(self.clock.current_time(), "start_traffic", user_id.raw(), "denied");
                return Err(Error::Denied(chain_id));
            }
            Err(e) => return Err(e),
        };

        let conn_id: ConnectionId = self.guids.alloc();
        if let Err(e) = self.reserve_path(&path, conn_id, bandwidth) {
            return Err(e);
        }

        let conn = Connection::new(conn_id, user_id, path, bandwidth);
        self.inner.write().unwrap().active_flows.insert(conn_id, conn.clone());
        self.events.record(self.clock.current_time(), "start_traffic", user_id.raw(), "admitted");
        log::info!("orchestrator: traffic started for user {} as connection {}", user_id, conn_id);
        Ok(conn)
    }

    fn reserve_path(&self, path: &[GraphNode], conn_id: ConnectionId, bandwidth: f64) -> Result<()> {
        let mut established = Vec::new();
        for pair in path.windows(2) {
            let Some(attrs) = self.substrate.edge_between(pair[0], pair[1]) else {
                continue;
            };
            let Some(link_id) = attrs.link_id else {
                continue;
            };
            match self.substrate.with_link_mut(link_id, |link| link.establish(conn_id.raw(), bandwidth)) {
                Ok(()) => established.push(link_id),
                Err(e) => {
                    for link_id in established {
                        let _ = self.substrate.with_link_mut(link_id, |link| link.close(conn_id.raw()).map(|_| ()));
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn release_path(&self, path: &[GraphNode], conn_id: ConnectionId) {
        for pair in path.windows(2) {
            let Some(attrs) = self.substrate.edge_between(pair[0], pair[1]) else {
                continue;
            };
            let Some(link_id) = attrs.link_id else {
                continue;
            };
            let _ = self.substrate.with_link_mut(link_id, |link| link.close(conn_id.raw()).map(|_| ()));
        }
    }

    pub fn stop_traffic(&self, conn_id: ConnectionId) -> Result<()> {
        let conn = self.inner.write().unwrap().active_flows.remove(&conn_id).ok_or(Error::ConnectionNotFound(conn_id))?;
        self.release_path(&conn.node_path, conn_id);
        self.events.record(self.clock.current_time(), "stop_traffic", conn_id.raw(), "stopped");
        log::info!("orchestrator: traffic stopped for connection {}", conn_id);
        Ok(())
    }

    pub fn get_connection(&self, conn_id: ConnectionId) -> Result<Connection> {
        self.inner.read().unwrap().active_flows.get(&conn_id).cloned().ok_or(Error::ConnectionNotFound(conn_id))
    }

    pub fn list_connections(&self) -> Vec<Connection> {
        let inner = self.inner.read().unwrap();
        let mut conns: Vec<_> = inner.active_flows.values().cloned().collect();
        conns.sort_by_key(|c| c.id);
        conns
    }

    fn connections_touching(&self, host_id: HostId) -> Vec<Connection> {
        let inner = self.inner.read().unwrap();
        inner.active_flows.values().filter(|c| c.node_path.contains(&GraphNode::Host(host_id))).cloned().collect()
    }

    /// Atomically moves `vm` from `src_host` to `dst_host`: stop its
    /// affected connections, reserve on the destination, only then
    /// release the source and move the pin edge, then restart traffic.
    /// Reserving before releasing the source (Phase B before Phase C) is
    /// what lets a failed reservation be undone by simply restarting the
    /// stopped connections against the still-intact source VM.
    pub fn migrate_vm(&self, vm_id: VmId, src_host: HostId, dst_host: HostId) -> Result<()> {
        if src_host == dst_host {
            return Ok(());
        }

        let vm = self.catalog.get_vm(vm_id)?;
        let service = self.catalog.get_service(vm.service)?;

        let affected = self.connections_touching(src_host);

        // Phase A: stop traffic on every connection that routes through the source host.
        for conn in &affected {
            self.stop_traffic(conn.id)?;
        }

        // Phase B: reserve on the destination before touching the source.
        if let Err(e) = self.substrate.with_host_mut(dst_host, |host| host.instantiate_service(vm_id, service.clone())) {
            for conn in &affected {
                if let Err(restart_err) = self.start_traffic(conn.user) {
                    log::warn!("orchestrator: failed to undo phase A for user {} after aborted migration: {}", conn.user, restart_err);
                }
            }
            self.events.record(self.clock.current_time(), "migrate_vm", vm_id.raw(), "failed");
            log::warn!("orchestrator: migration of vm {} to host {} aborted: {}", vm_id, dst_host, e);
            return Err(Error::MigrationFailed(dst_host));
        }

        // Phase C: release the source and move the vm's identity.
        self.substrate.with_host_mut(src_host, |host| host.kill_service(vm_id).map(|_| ()))?;
        self.substrate.move_vm_pin(GraphNode::Vm(vm_id), src_host, dst_host);
        self.catalog.set_vm_host(vm_id, dst_host)?;

        // Phase D: restart traffic against the vm's new host.
        let mut failures = 0usize;
        for conn in &affected {
            if let Err(e) = self.start_traffic(conn.user) {
                log::warn!("orchestrator: user {} denied after migrating vm {}: {}", conn.user, vm_id, e);
                failures += 1;
            }
        }

        if failures > 0 {
            self.events.record(self.clock.current_time(), "migrate_vm", vm_id.raw(), "partial");
            return Err(Error::PartialMigration(failures));
        }

        self.events.record(self.clock.current_time(), "migrate_vm", vm_id.raw(), "migrated");
        log::info!("orchestrator: vm {} migrated from host {} to host {}", vm_id, src_host, dst_host);
        Ok(())
    }

    /// Sum of edge delays along `conn`'s path.
    pub fn service_ping(&self, conn_id: ConnectionId) -> Result<f64> {
        let conn = self.get_connection(conn_id)?;
        let mut total = 0.0;
        for pair in conn.node_path.windows(2) {
            if let Some(attrs) = self.substrate.edge_between(pair[0], pair[1]) {
                total += attrs.delay_ms;
            }
        }
        Ok(total)
    }

    /// Sum over consecutive physical edges of the source host's
    /// `sample_energy`, datasize taken from that host's `bits_overhead`.
    pub fn service_data(&self, conn_id: ConnectionId) -> Result<f64> {
        let conn = self.get_connection(conn_id)?;
        let mut total = 0.0;
        for pair in conn.node_path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let Some(attrs) = self.substrate.edge_between(a, b) else {
                continue;
            };
            let Some(link_id) = attrs.link_id else {
                continue;
            };
            let GraphNode::Host(host_id) = a else {
                continue;
            };
            let datasize_bits = self.substrate.with_host(host_id, |host| host.bits_overhead)?;
            total += self.substrate.with_link_mut(link_id, |link| Ok(link.sample_energy(datasize_bits)))?;
        }
        Ok(total)
    }

    /// Advances the connection's user traffic pattern one tick and scores
    /// the result against the connection's ping, per
    /// `traffic_pattern_output / service_ping(conn)`.
    pub fn service_performance_score(&self, conn_id: ConnectionId) -> Result<f64> {
        let conn = self.get_connection(conn_id)?;
        let traffic_pattern_output = self.substrate.advance_user_pattern(conn.user)?;
        let ping = self.service_ping(conn_id)?;
        if ping == 0.0 {
            log::warn!("orchestrator: service_performance_score called with zero ping on connection {}", conn_id);
            return Ok(0.0);
        }
        Ok(traffic_pattern_output / ping)
    }

    /// Tears down every connection of `chain`'s users and terminates every
    /// vm in the chain, releasing their host reservations.
    pub fn free_chain(&self, chain_id: ChainId) -> Result<()> {
        let chain = self.catalog.get_chain(chain_id)?;

        let stale: Vec<ConnectionId> = {
            let inner = self.inner.read().unwrap();
            inner.active_flows.values().filter(|c| self.substrate.get_user(c.user).is_ok_and(|u| u.chain == chain_id)).map(|c| c.id).collect()
        };
        for conn_id in stale {
            let _ = self.stop_traffic(conn_id);
        }

        for vm_id in chain.vms() {
            self.catalog.terminate_vm(&self.substrate, vm_id)?;
        }

        self.catalog.remove_chain(chain_id)?;
        self.events.record(self.clock.current_time(), "free_chain", chain_id.raw(), "expired");
        log::info!("orchestrator: chain {} freed (ttl expiry)", chain_id);
        Ok(())
    }

    pub fn drain_events(&self) -> Vec<crate::event_log::EventRecord> {
        self.events.drain()
    }
}
