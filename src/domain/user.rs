use serde::{Deserialize, Serialize};

use crate::domain::ids::{ChainId, HostId, UserId};
use crate::domain::traffic_pattern::TrafficPattern;

/// An endpoint attached to the topology graph that consumes a `Chain` at
/// a given nominal bandwidth and traffic pattern. `counter` advances
/// monotonically to drive the pattern's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub host_id: HostId,
    pub chain: ChainId,
    pub bandwidth: f64,
    pub pattern: TrafficPattern,
    counter: u64,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, host_id: HostId, chain: ChainId, bandwidth: f64, pattern: TrafficPattern) -> Self {
        Self { id, name: name.into(), host_id, chain, bandwidth, pattern, counter: 0 }
    }

    /// Returns the datarate for the current tick and advances the
    /// counter, per the `trafficPatternGenerator` contract in §8 scenario 6.
    pub fn traffic_pattern_generator(&mut self) -> f64 {
        let output = self.pattern.output(self.counter, self.bandwidth);
        self.counter += 1;
        output
    }
}
