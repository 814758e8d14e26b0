//! Upstream server abstraction.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::dynamic::{Protocol, ServerDef};

/// A single server of a compiled service.
#[derive(Debug)]
pub struct Upstream {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    /// Number of requests currently forwarded to this server.
    pub in_flight: AtomicUsize,
}

impl Upstream {
    pub fn from_server(server: &ServerDef) -> Self {
        Self {
            host: server.host.clone(),
            port: server.port,
            protocol: server.protocol,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// `host:port` as used in the request URI.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Count a request against this upstream until the guard drops.
    pub fn track(self: &Arc<Self>) -> UpstreamGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        UpstreamGuard {
            upstream: Arc::clone(self),
        }
    }
}

/// A RAII guard that manages the in-flight count.
#[derive(Debug)]
pub struct UpstreamGuard {
    upstream: Arc<Upstream>,
}

impl Deref for UpstreamGuard {
    type Target = Upstream;
    fn deref(&self) -> &Self::Target {
        &self.upstream
    }
}

impl Drop for UpstreamGuard {
    fn drop(&mut self) {
        self.upstream.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_tracks_in_flight() {
        let upstream = Arc::new(Upstream::from_server(&ServerDef::new("10.0.0.1", 8080)));
        assert_eq!(upstream.authority(), "10.0.0.1:8080");

        let g1 = upstream.track();
        let g2 = upstream.track();
        assert_eq!(upstream.in_flight(), 2);

        drop(g1);
        assert_eq!(g2.in_flight(), 1);
        drop(g2);
        assert_eq!(upstream.in_flight(), 0);
    }
}
