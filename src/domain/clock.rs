//! The simulation clock: advances `current_time` and expires chains past
//! their `time_to_live`.

use std::sync::{Arc, RwLock};

use crate::domain::catalog::Catalog;
use crate::domain::orchestrator::Orchestrator;
use crate::error::Result;

#[derive(Debug, Default)]
struct ClockInner {
    current_time: f64,
}

#[derive(Debug, Clone)]
pub struct Clock {
    inner: Arc<RwLock<ClockInner>>,
}

impl Clock {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(ClockInner::default())) }
    }

    pub fn current_time(&self) -> f64 {
        self.inner.read().unwrap().current_time
    }

    /// Advances time by `dt`, then frees every chain whose `time_to_live`
    /// has passed. TTL expiries fire after the advance, before any
    /// subsequent `poll` can return — a chain is still live at the
    /// instant `time_to_live == current_time`.
    pub fn step(&self, dt: f64, catalog: &Catalog, orchestrator: &Orchestrator) -> Result<()> {
        let now = {
            let mut inner = self.inner.write().unwrap();
            inner.current_time += dt;
            inner.current_time
        };

        let expired: Vec<_> = catalog.list_chains().into_iter().filter(|c| c.time_to_live < now).map(|c| c.id).collect();
        for chain_id in expired {
            orchestrator.free_chain(chain_id)?;
        }
        Ok(())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::GuidCounter;
    use crate::domain::substrate::Substrate;
    use crate::event_log::EventLog;

    #[test]
    fn chain_survives_until_ttl_passes() {
        let guids = Arc::new(GuidCounter::new());
        let substrate = Substrate::new(guids.clone());
        let catalog = Catalog::new(guids.clone());
        let clock = Clock::new();
        let orchestrator = Orchestrator::new(guids, substrate, catalog.clone(), clock.clone(), Arc::new(EventLog::default()));

        let service = catalog.add_service("s", 1.0, 1.0, 1.0, 1.0);
        let chain_id = catalog.add_chain("c", vec![service], 10.0, 10.0).unwrap();

        clock.step(5.0, &catalog, &orchestrator).unwrap();
        assert!(catalog.get_chain(chain_id).is_ok());

        clock.step(6.0, &catalog, &orchestrator).unwrap();
        assert!(catalog.get_chain(chain_id).is_err());
    }
}
