use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::graph::{EdgeAttrs, TopologyGraph};
use crate::domain::ids::{ChainId, GraphNode, GuidCounter, HostId, LinkId, UserId};
use crate::domain::resource::{Host, Link};
use crate::domain::traffic_pattern::TrafficPattern;
use crate::domain::user::User;
use crate::error::{Error, Result};

/// Snapshot of a single host, safe to hand to an external agent: no
/// references back into the live store.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HostSnapshot {
    pub id: HostId,
    pub name: String,
    pub cpu_cap: f64,
    pub ram_cap: f64,
    pub storage_cap: f64,
    pub cpu_used: f64,
    pub ram_used: f64,
    pub storage_used: f64,
}

impl From<&Host> for HostSnapshot {
    fn from(h: &Host) -> Self {
        Self {
            id: h.id,
            name: h.name.clone(),
            cpu_cap: h.cpu_cap,
            ram_cap: h.ram_cap,
            storage_cap: h.storage_cap,
            cpu_used: h.cpu_used,
            ram_used: h.ram_used,
            storage_used: h.storage_used,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LinkSnapshot {
    pub id: LinkId,
    pub src_id: HostId,
    pub dst_id: HostId,
    pub bandwidth_cap: f64,
    pub bandwidth_used: f64,
    pub latency_ms: f64,
    pub loss: bool,
}

impl From<&Link> for LinkSnapshot {
    fn from(l: &Link) -> Self {
        Self {
            id: l.id,
            src_id: l.src_id,
            dst_id: l.dst_id,
            bandwidth_cap: l.bandwidth_cap,
            bandwidth_used: l.bandwidth_used,
            latency_ms: l.latency_ms,
            loss: l.loss,
        }
    }
}

#[derive(Debug, Default)]
struct SubstrateInner {
    hosts: HashMap<HostId, Host>,
    links: HashMap<LinkId, Link>,
    users: HashMap<UserId, User>,
    graph: TopologyGraph,
}

/// Owns every `Host`, `Link`, and the topology `Graph`. The graph is the
/// single source of truth for routing; these resource stores are the
/// single source of truth for admission — see the design notes on why
/// bandwidth is never duplicated between the two.
#[derive(Debug, Clone)]
pub struct Substrate {
    guids: Arc<GuidCounter>,
    inner: Arc<RwLock<SubstrateInner>>,
}

impl Substrate {
    pub fn new(guids: Arc<GuidCounter>) -> Self {
        Self { guids, inner: Arc::new(RwLock::new(SubstrateInner::default())) }
    }

    pub fn add_host(
        &self,
        name: impl Into<String>,
        cpu_cap: f64,
        ram_cap: f64,
        storage_cap: f64,
        cpu_frequency_hz: f64,
        cycles_per_sample: f64,
        effective_capacitance: f64,
        bits_overhead: f64,
    ) -> HostId {
        let id: HostId = self.guids.alloc();
        let host = Host::new(id, name, cpu_cap, ram_cap, storage_cap, cpu_frequency_hz, cycles_per_sample, effective_capacitance, bits_overhead);

        let mut inner = self.inner.write().unwrap();
        inner.graph.add_node(GraphNode::Host(id));
        inner.hosts.insert(id, host);
        log::info!("substrate: host {} added", id);
        id
    }

    pub fn add_link(&self, src_id: HostId, dst_id: HostId, bandwidth_cap: f64, delay_ms: f64, loss: bool) -> Result<LinkId> {
        if src_id == dst_id {
            return Err(Error::InvalidLink(src_id));
        }

        let id: LinkId = self.guids.alloc();
        let link = Link::new(id, src_id, dst_id, bandwidth_cap, delay_ms, -2.0, loss);

        let mut inner = self.inner.write().unwrap();
        if !inner.hosts.contains_key(&src_id) {
            return Err(Error::HostNotFound(src_id));
        }
        if !inner.hosts.contains_key(&dst_id) {
            return Err(Error::HostNotFound(dst_id));
        }
        inner.graph.add_edge(GraphNode::Host(src_id), GraphNode::Host(dst_id), EdgeAttrs::physical(id, delay_ms));
        inner.links.insert(id, link);
        log::info!("substrate: link {} added ({} <-> {}, bw={})", id, src_id, dst_id, bandwidth_cap);
        Ok(id)
    }

    pub fn remove_link(&self, link_id: LinkId) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let link = inner.links.remove(&link_id).ok_or(Error::LinkNotFound(link_id))?;
        inner.graph.remove_edge(GraphNode::Host(link.src_id), GraphNode::Host(link.dst_id));
        log::info!("substrate: link {} removed", link_id);
        Ok(())
    }

    pub fn add_user(&self, name: impl Into<String>, host_id: HostId, chain: ChainId, bandwidth: f64, pattern: TrafficPattern) -> Result<UserId> {
        let id: UserId = self.guids.alloc();
        let user = User::new(id, name, host_id, chain, bandwidth, pattern);

        let mut inner = self.inner.write().unwrap();
        if !inner.hosts.contains_key(&host_id) {
            return Err(Error::HostNotFound(host_id));
        }
        inner.graph.add_node(GraphNode::User(id));
        inner.graph.add_edge(GraphNode::User(id), GraphNode::Host(host_id), EdgeAttrs::pin());
        inner.users.insert(id, user);
        log::info!("substrate: user {} added at host {}", id, host_id);
        Ok(id)
    }

    pub fn remove_user(&self, user_id: UserId) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.users.remove(&user_id).ok_or(Error::UserNotFound(user_id))?;
        inner.graph.remove_node(GraphNode::User(user_id));
        log::info!("substrate: user {} removed", user_id);
        Ok(())
    }

    pub fn query_host(&self, host_id: HostId) -> Result<HostSnapshot> {
        let inner = self.inner.read().unwrap();
        inner.hosts.get(&host_id).map(HostSnapshot::from).ok_or(Error::HostNotFound(host_id))
    }

    pub fn query_link(&self, link_id: LinkId) -> Result<LinkSnapshot> {
        let inner = self.inner.read().unwrap();
        inner.links.get(&link_id).map(LinkSnapshot::from).ok_or(Error::LinkNotFound(link_id))
    }

    pub fn list_hosts(&self) -> Vec<HostSnapshot> {
        let inner = self.inner.read().unwrap();
        let mut hosts: Vec<_> = inner.hosts.values().map(HostSnapshot::from).collect();
        hosts.sort_by_key(|h| h.id);
        hosts
    }

    pub fn list_links(&self) -> Vec<LinkSnapshot> {
        let inner = self.inner.read().unwrap();
        let mut links: Vec<_> = inner.links.values().map(LinkSnapshot::from).collect();
        links.sort_by_key(|l| l.id);
        links
    }

    pub fn get_user(&self, user_id: UserId) -> Result<User> {
        let inner = self.inner.read().unwrap();
        inner.users.get(&user_id).cloned().ok_or(Error::UserNotFound(user_id))
    }

    pub fn list_users(&self) -> Vec<User> {
        let inner = self.inner.read().unwrap();
        let mut users: Vec<_> = inner.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        users
    }

    pub fn advance_user_pattern(&self, user_id: UserId) -> Result<f64> {
        let mut inner = self.inner.write().unwrap();
        let user = inner.users.get_mut(&user_id).ok_or(Error::UserNotFound(user_id))?;
        Ok(user.traffic_pattern_generator())
    }

    pub fn host_count(&self) -> usize {
        self.inner.read().unwrap().hosts.len()
    }

    pub fn link_count(&self) -> usize {
        self.inner.read().unwrap().links.len()
    }

    // --- Internal access for the orchestrator/router; not part of the
    // agent-facing surface. ---

    pub(crate) fn with_host_mut<R>(&self, host_id: HostId, f: impl FnOnce(&mut Host) -> Result<R>) -> Result<R> {
        let mut inner = self.inner.write().unwrap();
        let host = inner.hosts.get_mut(&host_id).ok_or(Error::HostNotFound(host_id))?;
        f(host)
    }

    pub(crate) fn with_host<R>(&self, host_id: HostId, f: impl FnOnce(&Host) -> R) -> Result<R> {
        let inner = self.inner.read().unwrap();
        let host = inner.hosts.get(&host_id).ok_or(Error::HostNotFound(host_id))?;
        Ok(f(host))
    }

    pub(crate) fn with_link_mut<R>(&self, link_id: LinkId, f: impl FnOnce(&mut Link) -> Result<R>) -> Result<R> {
        let mut inner = self.inner.write().unwrap();
        let link = inner.links.get_mut(&link_id).ok_or(Error::LinkNotFound(link_id))?;
        f(link)
    }

    pub(crate) fn host_exists(&self, host_id: HostId) -> bool {
        self.inner.read().unwrap().hosts.contains_key(&host_id)
    }

    pub(crate) fn add_vm_pin(&self, vm_node: GraphNode, host_id: HostId) {
        let mut inner = self.inner.write().unwrap();
        inner.graph.add_node(vm_node);
        inner.graph.add_edge(vm_node, GraphNode::Host(host_id), EdgeAttrs::pin());
    }

    pub(crate) fn move_vm_pin(&self, vm_node: GraphNode, old_host: HostId, new_host: HostId) {
        let mut inner = self.inner.write().unwrap();
        inner.graph.remove_edge(vm_node, GraphNode::Host(old_host));
        inner.graph.add_edge(vm_node, GraphNode::Host(new_host), EdgeAttrs::pin());
    }

    pub(crate) fn remove_vm_pin(&self, vm_node: GraphNode) {
        let mut inner = self.inner.write().unwrap();
        inner.graph.remove_node(vm_node);
    }

    pub(crate) fn edge_between(&self, a: GraphNode, b: GraphNode) -> Option<EdgeAttrs> {
        self.inner.read().unwrap().graph.edge(a, b)
    }

    pub(crate) fn shortest_path(&self, src: GraphNode, dst: GraphNode) -> Option<Vec<GraphNode>> {
        self.inner.read().unwrap().graph.shortest_path(src, dst)
    }

    pub(crate) fn suspend_edge(&self, a: GraphNode, b: GraphNode) -> Option<EdgeAttrs> {
        self.inner.write().unwrap().graph.remove_edge(a, b)
    }

    pub(crate) fn restore_edge(&self, a: GraphNode, b: GraphNode, attrs: EdgeAttrs) {
        self.inner.write().unwrap().graph.add_edge(a, b, attrs);
    }

    pub(crate) fn residual_bandwidth(&self, link_id: LinkId) -> Result<f64> {
        let inner = self.inner.read().unwrap();
        inner.links.get(&link_id).map(Link::residual_bandwidth).ok_or(Error::LinkNotFound(link_id))
    }
}
