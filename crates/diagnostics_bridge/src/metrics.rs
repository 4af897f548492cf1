use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing bridge activity.
///
/// Every ingest call may run on a different host thread, so all counters are
/// atomics updated with relaxed ordering; they are observations, not
/// synchronization.
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    /// Payloads successfully decoded into span records
    pub spans_received: AtomicU64,
    /// Span messages accepted by the outbound channel
    pub spans_forwarded: AtomicU64,
    /// Sends that failed, timed out or were cancelled
    pub forward_errors: AtomicU64,
    /// Times the argument file was consulted
    pub port_resolutions: AtomicU64,
    /// Strategies successfully started
    pub strategies_started: AtomicU64,
}

impl BridgeMetrics {
    pub fn spans_received(&self) -> u64 {
        self.spans_received.load(Ordering::Relaxed)
    }

    pub fn spans_forwarded(&self) -> u64 {
        self.spans_forwarded.load(Ordering::Relaxed)
    }

    pub fn forward_errors(&self) -> u64 {
        self.forward_errors.load(Ordering::Relaxed)
    }

    pub fn port_resolutions(&self) -> u64 {
        self.port_resolutions.load(Ordering::Relaxed)
    }

    pub fn strategies_started(&self) -> u64 {
        self.strategies_started.load(Ordering::Relaxed)
    }

    pub(crate) fn record_received(&self) {
        self.spans_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_forwarded(&self) {
        self.spans_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_forward_error(&self) {
        self.forward_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_port_resolution(&self) {
        self.port_resolutions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_strategy_started(&self) {
        self.strategies_started.fetch_add(1, Ordering::Relaxed);
    }
}
