//! Rebuild rate limiting and snapshot coalescing.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::dynamic::DynamicModel;

/// Minimum spacing between two processing steps.
///
/// The interval is counted from the end of the previous step, so a slow
/// compile does not cause back-to-back rebuilds.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    next_allowed: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_allowed: None,
        }
    }

    /// Earliest instant the next step may run. `None` means right away.
    pub fn deadline(&self) -> Option<Instant> {
        self.next_allowed
    }

    pub fn is_ready(&self, now: Instant) -> bool {
        self.next_allowed.map_or(true, |deadline| now >= deadline)
    }

    /// Record that a step just finished.
    pub fn mark(&mut self, now: Instant) {
        self.next_allowed = Some(now + self.interval);
    }
}

/// Latest pending configuration per provider.
#[derive(Debug, Default)]
pub struct Coalescer {
    pending: BTreeMap<String, DynamicModel>,
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a provider's configuration. Returns true when it replaced an
    /// earlier pending one from the same provider.
    pub fn push(&mut self, provider: String, model: DynamicModel) -> bool {
        self.pending.insert(provider, model).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Drain everything queued so far.
    pub fn take(&mut self) -> Vec<(String, DynamicModel)> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::{ServerDef, ServiceDef};

    fn model(port: u16) -> DynamicModel {
        DynamicModel {
            services: vec![ServiceDef::new("svc", vec![ServerDef::new("127.0.0.1", port)])],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn first_step_is_immediate() {
        let throttle = Throttle::new(Duration::from_secs(2));
        assert!(throttle.deadline().is_none());
        assert!(throttle.is_ready(Instant::now()));
    }

    #[tokio::test]
    async fn waits_one_interval_after_a_step() {
        let mut throttle = Throttle::new(Duration::from_secs(2));
        let now = Instant::now();
        throttle.mark(now);

        assert!(!throttle.is_ready(now + Duration::from_secs(1)));
        assert!(throttle.is_ready(now + Duration::from_secs(2)));
        assert_eq!(throttle.deadline(), Some(now + Duration::from_secs(2)));
    }

    #[test]
    fn keeps_only_latest_per_provider() {
        let mut coalescer = Coalescer::new();
        assert!(!coalescer.push("file".into(), model(1)));
        assert!(coalescer.push("file".into(), model(2)));
        assert!(!coalescer.push("docker".into(), model(3)));
        assert_eq!(coalescer.len(), 2);

        let drained = coalescer.take();
        assert!(coalescer.is_empty());
        assert_eq!(drained[0].0, "docker");
        assert_eq!(drained[1], ("file".to_string(), model(2)));
    }
}
