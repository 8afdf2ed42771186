use serde::{Deserialize, Serialize};

use crate::domain::ids::{HostId, LinkId};
use crate::error::{Error, Result};

/// Undirected capacitated edge between two hosts.
///
/// Bandwidth reservations are tracked generically, keyed by a raw guid
/// (a `ServiceId` when reserved through the resource-primitive API in
/// §4.1, a `ConnectionId` when reserved by the router in §4.5) so both
/// callers share one accounting path and a reservation is always released
/// with exactly the amount it was established with. A single key may
/// `establish` more than once — a connection's routed path can cross the
/// same physical link on two different hops — so reservations are kept as
/// a list of `(key, amount)` occurrences rather than a single-valued map;
/// `close` releases exactly one occurrence per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub src_id: HostId,
    pub dst_id: HostId,

    pub bandwidth_cap: f64,
    pub bandwidth_used: f64,
    pub latency_ms: f64,
    pub optical_power_tx_dbm: f64,

    /// Distinguishes wired (false) from wireless (true) links for
    /// visualization; never affects admission.
    pub loss: bool,

    reservations: Vec<(u64, f64)>,
}

impl Link {
    pub fn new(id: LinkId, src_id: HostId, dst_id: HostId, bandwidth_cap: f64, latency_ms: f64, optical_power_tx_dbm: f64, loss: bool) -> Self {
        Self {
            id,
            src_id,
            dst_id,
            bandwidth_cap,
            bandwidth_used: 0.0,
            latency_ms,
            optical_power_tx_dbm,
            loss,
            reservations: Vec::new(),
        }
    }

    pub fn connects(&self, a: HostId, b: HostId) -> bool {
        (self.src_id == a && self.dst_id == b) || (self.src_id == b && self.dst_id == a)
    }

    pub fn other_end(&self, one: HostId) -> Option<HostId> {
        if self.src_id == one {
            Some(self.dst_id)
        } else if self.dst_id == one {
            Some(self.src_id)
        } else {
            None
        }
    }

    pub fn can_establish(&self, amount: f64) -> bool {
        self.bandwidth_used + amount <= self.bandwidth_cap
    }

    pub fn establish(&mut self, key: u64, amount: f64) -> Result<()> {
        if !self.can_establish(amount) {
            return Err(Error::BandwidthExceeded(self.id));
        }
        self.bandwidth_used += amount;
        self.reservations.push((key, amount));
        Ok(())
    }

    /// Releases one occurrence reserved under `key`. If `key` established
    /// more than once (the same connection crossing this link on two
    /// hops), each `close` call releases a single occurrence — callers
    /// must call it once per matching `establish`.
    pub fn close(&mut self, key: u64) -> Result<f64> {
        let index = self.reservations.iter().position(|(k, _)| *k == key).ok_or(Error::NotEstablished { key, link: self.id })?;
        let (_, amount) = self.reservations.remove(index);
        self.bandwidth_used = (self.bandwidth_used - amount).max(0.0);
        Ok(amount)
    }

    pub fn residual_bandwidth(&self) -> f64 {
        self.bandwidth_cap - self.bandwidth_used
    }

    /// Energy to move `datasize_bits` across this link right now.
    /// Undefined at `bandwidth_used == 0` (dividing by the link's current
    /// load, not by its capacity); per the design note, callers that hit
    /// that case get `0.0` back instead of a NaN/inf, rather than being
    /// required to prove the link is active before calling.
    pub fn sample_energy(&self, datasize_bits: f64) -> f64 {
        if self.bandwidth_used == 0.0 {
            log::warn!("link {}: sample_energy called with no active flow, returning 0", self.id);
            return 0.0;
        }
        -self.optical_power_tx_dbm * (datasize_bits / self.bandwidth_used) * 1e-9
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::GuidCounter;

    fn new_link(bandwidth_cap: f64, optical_power_tx_dbm: f64) -> Link {
        let guids = GuidCounter::new();
        let id: LinkId = guids.alloc();
        let h1: HostId = guids.alloc();
        let h2: HostId = guids.alloc();
        Link::new(id, h1, h2, bandwidth_cap, 1.0, optical_power_tx_dbm, false)
    }

    #[test]
    fn sample_energy_on_an_idle_link_is_zero() {
        let link = new_link(10.0, -2.0);
        assert_eq!(link.sample_energy(8_440_000.0), 0.0);
    }

    #[test]
    fn sample_energy_matches_the_single_hop_scenario() {
        let mut link = new_link(10.0, -2.0);
        link.establish(1, 5.0).unwrap();

        let energy = link.sample_energy(8_440_000.0);
        assert!((energy - 3.376e-3).abs() < 1e-6);
    }

    #[test]
    fn establish_then_close_restores_bandwidth() {
        let mut link = new_link(10.0, -2.0);
        link.establish(1, 4.0).unwrap();
        assert_eq!(link.bandwidth_used, 4.0);

        link.close(1).unwrap();
        assert_eq!(link.bandwidth_used, 0.0);
    }

    #[test]
    fn establish_beyond_capacity_is_rejected() {
        let mut link = new_link(1.0, -2.0);
        let err = link.establish(1, 2.0).unwrap_err();
        assert!(matches!(err, Error::BandwidthExceeded(_)));
        assert_eq!(link.bandwidth_used, 0.0);
    }

    #[test]
    fn close_an_unestablished_key_fails() {
        let mut link = new_link(10.0, -2.0);
        let err = link.close(1).unwrap_err();
        assert!(matches!(err, Error::NotEstablished { .. }));
    }

    #[test]
    fn the_same_key_can_establish_twice_and_each_close_releases_one() {
        let mut link = new_link(10.0, -2.0);
        link.establish(1, 3.0).unwrap();
        link.establish(1, 2.0).unwrap();
        assert_eq!(link.bandwidth_used, 5.0);

        link.close(1).unwrap();
        assert_eq!(link.bandwidth_used, 2.0);

        link.close(1).unwrap();
        assert_eq!(link.bandwidth_used, 0.0);

        let err = link.close(1).unwrap_err();
        assert!(matches!(err, Error::NotEstablished { .. }));
    }
}
