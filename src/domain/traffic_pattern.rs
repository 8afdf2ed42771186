use serde::{Deserialize, Serialize};

/// Selects the datarate-over-time function a `User` emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrafficPattern {
    /// Constant at the user's nominal bandwidth.
    Reserved,
    /// Alternates between 30% and 100% of nominal bandwidth every tick.
    Square,
    /// Ramps from 0% to 90% of nominal bandwidth in 10% steps, then
    /// wraps back to 0%.
    Saw,
}

impl TrafficPattern {
    /// Returns the datarate for the current `counter` value and nominal
    /// `bandwidth`, without advancing the counter — advancing is the
    /// caller's (`User`'s) responsibility so the sequence is observable
    /// and testable independent of mutation.
    pub fn output(self, counter: u64, bandwidth: f64) -> f64 {
        match self {
            TrafficPattern::Reserved => bandwidth,
            TrafficPattern::Square => {
                if counter % 2 == 0 {
                    0.3 * bandwidth
                } else {
                    bandwidth
                }
            }
            TrafficPattern::Saw => (counter % 10) as f64 * 0.1 * bandwidth,
        }
    }
}
