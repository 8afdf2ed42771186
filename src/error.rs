use thiserror::Error;

use crate::domain::ids::{ChainId, ConnectionId, HostId, LinkId, ServiceId, UserId, VmId};

/// Which capacity dimension was exhausted on a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostDimension {
    Cpu,
    Ram,
    Storage,
}

impl std::fmt::Display for HostDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostDimension::Cpu => write!(f, "cpu"),
            HostDimension::Ram => write!(f, "ram"),
            HostDimension::Storage => write!(f, "storage"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("host {0:?} not found")]
    HostNotFound(HostId),

    #[error("link {0:?} not found")]
    LinkNotFound(LinkId),

    #[error("service {0:?} not found")]
    ServiceNotFound(ServiceId),

    #[error("vm {0:?} not found")]
    VmNotFound(VmId),

    #[error("chain {0:?} not found")]
    ChainNotFound(ChainId),

    #[error("user {0:?} not found")]
    UserNotFound(UserId),

    #[error("connection {0:?} not found")]
    ConnectionNotFound(ConnectionId),

    #[error("insufficient {dim} capacity on host {host}")]
    CapacityExceeded { dim: HostDimension, host: HostId },

    #[error("insufficient bandwidth on link {0:?}")]
    BandwidthExceeded(LinkId),

    #[error("no route available for the requested chain")]
    NoRouteAvailable,

    #[error("admission refused for chain {0:?}: no route at current residuals")]
    Denied(ChainId),

    #[error("chain {0:?} is not fully embedded yet")]
    ChainNotEmbedded(ChainId),

    #[error("vm {vm:?} has no resident service reservation on host {host:?}")]
    NotResident { vm: VmId, host: HostId },

    #[error("reservation {key} has no established flow on link {link:?}")]
    NotEstablished { key: u64, link: LinkId },

    #[error("migration failed: insufficient capacity on destination host {0:?}")]
    MigrationFailed(HostId),

    #[error("migration moved the vm but {0} of its connections could not be restarted")]
    PartialMigration(usize),

    #[error("link {0:?} would form a self-loop, which is not allowed")]
    InvalidLink(HostId),

    #[error("chain must contain at least one vm")]
    EmptyChain,

    #[error("failed to encode snapshot for the wire: {0}")]
    WireEncode(String),

    #[error("failed to decode snapshot from the wire: {0}")]
    WireDecode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
