//! Simulator-wide configuration, read from the environment the same way
//! `logger::init` reads `RUST_LOG`.

use crate::domain::traffic_pattern::TrafficPattern;

/// Edge weight the router optimizes for. spec.md §4.4 pins the shipped
/// algorithm to `Delay`; `BandwidthInverse` is accepted as a configured
/// value for forward compatibility but has no distinct weight function
/// wired into `Router` yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingWeight {
    Delay,
    BandwidthInverse,
}

impl Default for RoutingWeight {
    fn default() -> Self {
        RoutingWeight::Delay
    }
}

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub routing_weight: RoutingWeight,
    pub default_traffic_pattern: TrafficPattern,
    pub event_log_capacity: usize,
}

impl SimulatorConfig {
    pub fn from_env() -> Self {
        let routing_weight = match std::env::var("VNFNET_ROUTING_WEIGHT").ok().as_deref() {
            Some("bandwidth_inverse") => RoutingWeight::BandwidthInverse,
            _ => RoutingWeight::Delay,
        };
        let default_traffic_pattern = match std::env::var("VNFNET_TRAFFIC_PATTERN").ok().as_deref() {
            Some("square") => TrafficPattern::Square,
            Some("saw") => TrafficPattern::Saw,
            _ => TrafficPattern::Reserved,
        };
        let event_log_capacity = std::env::var("VNFNET_EVENT_LOG_CAPACITY").ok().and_then(|v| v.parse().ok()).unwrap_or(1024);

        Self { routing_weight, default_traffic_pattern, event_log_capacity }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self { routing_weight: RoutingWeight::default(), default_traffic_pattern: TrafficPattern::Reserved, event_log_capacity: 1024 }
    }
}
