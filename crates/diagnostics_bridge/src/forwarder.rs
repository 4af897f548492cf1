//! Best-effort delivery of spans to a connected strategy.
//!
//! Forwarding is a synchronous boundary over an asynchronous interior: the send
//! runs as a task on the bridge's runtime while the calling thread blocks on
//! its completion, bounded by the configured send timeout.

use crate::connection::Connection;
use crate::error::ForwardError;
use crate::metrics::BridgeMetrics;
use crate::span::SpanRecord;
use crate::strategy::ServerStrategy;
use crate::wire::SpanMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

pub struct SpanForwarder {
    runtime: Handle,
    send_timeout: Duration,
    metrics: Arc<BridgeMetrics>,
}

impl SpanForwarder {
    pub fn new(runtime: Handle, send_timeout: Duration, metrics: Arc<BridgeMetrics>) -> Self {
        Self {
            runtime,
            send_timeout,
            metrics,
        }
    }

    /// Sends one span. Failures are logged and dropped; nothing is retried.
    pub fn forward<S: ServerStrategy>(&self, connection: &Connection<S>, span: &SpanRecord) {
        match self.try_forward(connection, span) {
            Ok(()) => self.metrics.record_forwarded(),
            Err(e) => {
                self.metrics.record_forward_error();
                tracing::warn!(
                    span_name = %span.name,
                    error = %e,
                    "sending events to the diagnostics service resulted in an error"
                );
            }
        }
    }

    fn try_forward<S: ServerStrategy>(&self, connection: &Connection<S>, span: &SpanRecord) -> Result<(), ForwardError> {
        // Blocking inside a runtime would panic; refuse instead.
        if Handle::try_current().is_ok() {
            return Err(ForwardError::AsyncContext);
        }

        let message = SpanMessage::from(span);
        let strategy = Arc::clone(connection.strategy());
        let send_timeout = self.send_timeout;
        let task = self
            .runtime
            .spawn(async move { tokio::time::timeout(send_timeout, strategy.send(message)).await });

        match self.runtime.block_on(task) {
            Ok(Ok(result)) => result.map_err(ForwardError::from),
            Ok(Err(_elapsed)) => Err(ForwardError::Timeout(send_timeout)),
            Err(join_error) => Err(ForwardError::Task(join_error.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::TestArguments;
    use crate::connection::ConnectionManager;
    use crate::port::{PortResolver, SERVER_PORT_ARG};
    use crate::span::SpanKind;
    use crate::strategy::testing::{recording_factory, Behavior, CallLog};
    use crate::strategy::StrategyFactory;

    struct Fixture<F: StrategyFactory> {
        _dir: tempfile::TempDir,
        runtime: tokio::runtime::Runtime,
        manager: ConnectionManager<F>,
        metrics: Arc<BridgeMetrics>,
    }

    fn fixture(behavior: Behavior) -> (Fixture<impl StrategyFactory>, Arc<CallLog>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_args.dat");
        TestArguments::from_pairs([(SERVER_PORT_ARG, "7000")]).write_to(&path).unwrap();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let (factory, log) = recording_factory(behavior);
        let metrics = Arc::new(BridgeMetrics::default());
        let manager = ConnectionManager::new(
            PortResolver::new(path),
            factory,
            runtime.handle().clone(),
            Arc::clone(&metrics),
        );
        (
            Fixture {
                _dir: dir,
                runtime,
                manager,
                metrics,
            },
            log,
        )
    }

    fn span(name: &str) -> SpanRecord {
        SpanRecord::new(3, 4, 0, name.to_string(), SpanKind::Internal)
    }

    #[test]
    fn test_forward_sends_translated_span() {
        let (fx, log) = fixture(Behavior::Accept);
        let forwarder = SpanForwarder::new(fx.runtime.handle().clone(), Duration::from_secs(1), Arc::clone(&fx.metrics));
        let connection = fx.manager.ensure_connected().unwrap();

        let record = span("login");
        forwarder.forward(&connection, &record);

        assert_eq!(log.sent(), vec![SpanMessage::from(&record)]);
        assert_eq!(fx.metrics.spans_forwarded(), 1);
        assert_eq!(fx.metrics.forward_errors(), 0);
    }

    #[test]
    fn test_send_failure_is_swallowed() {
        let (fx, log) = fixture(Behavior::FailSend);
        let forwarder = SpanForwarder::new(fx.runtime.handle().clone(), Duration::from_secs(1), Arc::clone(&fx.metrics));
        let connection = fx.manager.ensure_connected().unwrap();

        forwarder.forward(&connection, &span("a"));
        forwarder.forward(&connection, &span("b"));

        assert!(log.sent().is_empty());
        assert_eq!(fx.metrics.forward_errors(), 2);
        assert_eq!(fx.metrics.spans_forwarded(), 0);
    }

    #[test]
    fn test_stuck_channel_times_out() {
        let (fx, _log) = fixture(Behavior::Hang);
        let forwarder = SpanForwarder::new(fx.runtime.handle().clone(), Duration::from_millis(50), Arc::clone(&fx.metrics));
        let connection = fx.manager.ensure_connected().unwrap();

        let result = forwarder.try_forward(&connection, &span("stuck"));
        assert!(matches!(result, Err(ForwardError::Timeout(d)) if d == Duration::from_millis(50)));

        forwarder.forward(&connection, &span("stuck"));
        assert_eq!(fx.metrics.forward_errors(), 1);
    }

    #[test]
    fn test_panicking_send_is_contained() {
        let (fx, _log) = fixture(Behavior::Panic);
        let forwarder = SpanForwarder::new(fx.runtime.handle().clone(), Duration::from_secs(1), Arc::clone(&fx.metrics));
        let connection = fx.manager.ensure_connected().unwrap();

        let result = forwarder.try_forward(&connection, &span("boom"));
        assert!(matches!(result, Err(ForwardError::Task(_))));
    }

    #[test]
    fn test_refuses_to_block_inside_runtime() {
        let (fx, log) = fixture(Behavior::Accept);
        let forwarder = SpanForwarder::new(fx.runtime.handle().clone(), Duration::from_secs(1), Arc::clone(&fx.metrics));
        let connection = fx.manager.ensure_connected().unwrap();

        let _guard = fx.runtime.enter();
        let result = forwarder.try_forward(&connection, &span("nested"));
        assert!(matches!(result, Err(ForwardError::AsyncContext)));
        assert!(log.sent().is_empty());
    }
}
