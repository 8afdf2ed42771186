//! Wire-format snapshot sent to the external placement agent, and the
//! JSON/binary serialization hooks the facade exposes so the agent can
//! live out-of-process.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::{Catalog, Chain};
use crate::domain::resource::Service;
use crate::domain::substrate::{HostSnapshot, LinkSnapshot, Substrate};
use crate::error::{Error, Result};

/// Read-only view of the substrate and catalog state, safe to hand to an
/// out-of-process agent: no live references, just data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstrateSnapshot {
    pub hosts: Vec<HostSnapshot>,
    pub links: Vec<LinkSnapshot>,
    pub services: Vec<Service>,
    pub chains: Vec<Chain>,
}

impl SubstrateSnapshot {
    pub fn capture(substrate: &Substrate, catalog: &Catalog) -> Self {
        Self { hosts: substrate.list_hosts(), links: substrate.list_links(), services: catalog.list_services(), chains: catalog.list_chains() }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::WireEncode(e.to_string()))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::WireDecode(e.to_string()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::WireEncode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::WireDecode(e.to_string()))
    }
}
