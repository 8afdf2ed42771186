//! Entity identifiers.
//!
//! A single monotonic counter allocates guids across *every* entity kind
//! (hosts, links, services, vms, chains, users, connections) so that graph
//! node ids, link ids, and every other entity id share one namespace, per
//! the identifier discipline in the spec. Each kind gets its own
//! phantom-tagged `Id<T>` so the compiler rejects mixing, e.g., a `HostId`
//! where a `VmId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T> {
    raw: u64,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    const fn new(raw: u64) -> Self {
        Id { raw, _marker: PhantomData }
    }

    pub fn raw(&self) -> u64 {
        self.raw
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Id<T> {}
impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
impl<T> Eq for Id<T> {}
impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}
impl<T> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.rsplit("::").next().unwrap_or(full_name);
        write!(f, "{}({})", clean_name, self.raw)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HostTag;
#[derive(Debug, Clone, Copy)]
pub struct LinkTag;
#[derive(Debug, Clone, Copy)]
pub struct ServiceTag;
#[derive(Debug, Clone, Copy)]
pub struct VmTag;
#[derive(Debug, Clone, Copy)]
pub struct ChainTag;
#[derive(Debug, Clone, Copy)]
pub struct UserTag;
#[derive(Debug, Clone, Copy)]
pub struct ConnectionTag;

pub type HostId = Id<HostTag>;
pub type LinkId = Id<LinkTag>;
pub type ServiceId = Id<ServiceTag>;
pub type VmId = Id<VmTag>;
pub type ChainId = Id<ChainTag>;
pub type UserId = Id<UserTag>;
pub type ConnectionId = Id<ConnectionTag>;

/// A graph node is always one of a host, a vm, or a user; this tagged id
/// lets routing code treat the three uniformly while still being able to
/// recover which kind of entity a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GraphNode {
    Host(HostId),
    Vm(VmId),
    User(UserId),
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphNode::Host(id) => write!(f, "host:{}", id),
            GraphNode::Vm(id) => write!(f, "vm:{}", id),
            GraphNode::User(id) => write!(f, "user:{}", id),
        }
    }
}

/// The single identifier authority for the substrate. Every `add_*`
/// operation across hosts, links, vms, chains, services, users, and
/// connections draws from this one counter; no entity kind is ever given
/// its own private counter.
#[derive(Debug, Default)]
pub struct GuidCounter {
    next: AtomicU64,
}

impl GuidCounter {
    pub fn new() -> Self {
        Self { next: AtomicU64::new(0) }
    }

    fn alloc_raw(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    pub fn alloc<T>(&self) -> Id<T> {
        Id::new(self.alloc_raw())
    }
}
