use crate::config::BridgeConfig;
use crate::connection::{ConnectionManager, ConnectionPhase};
use crate::error::{BridgeError, ConnectError};
use crate::forwarder::SpanForwarder;
use crate::metrics::BridgeMetrics;
use crate::port::PortResolver;
use crate::span::SpanRecord;
use crate::strategy::{ServerStrategy, StrategyFactory};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

/// Per-process diagnostics context.
///
/// Owns the background runtime that strategy tasks run on, the connection
/// state and the forwarder. Create one at process start and share it (behind
/// an `Arc`) with every thread that receives spans.
///
/// The bridge must be created and dropped outside of any async runtime, since
/// it owns a runtime of its own.
pub struct DiagnosticsBridge<F: StrategyFactory> {
    connection: ConnectionManager<F>,
    forwarder: SpanForwarder,
    metrics: Arc<BridgeMetrics>,
    send_timeout: Duration,
    // Declared last so strategies are dropped before the runtime shuts down.
    runtime: Runtime,
}

impl<F: StrategyFactory> DiagnosticsBridge<F> {
    pub fn new(config: BridgeConfig, factory: F) -> Result<Self, BridgeError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name("diagnostics-bridge")
            .enable_all()
            .build()
            .map_err(BridgeError::Runtime)?;

        let metrics = Arc::new(BridgeMetrics::default());
        let connection = ConnectionManager::new(
            PortResolver::new(config.args_file_path()),
            factory,
            runtime.handle().clone(),
            Arc::clone(&metrics),
        );
        let forwarder = SpanForwarder::new(runtime.handle().clone(), config.send_timeout, Arc::clone(&metrics));

        Ok(Self {
            connection,
            forwarder,
            metrics,
            send_timeout: config.send_timeout,
            runtime,
        })
    }

    /// Handles one serialized span from the test process.
    ///
    /// Only a corrupt payload or a corrupt argument file is reported back;
    /// missing configuration, connection failures and send failures are
    /// logged and otherwise ignored.
    pub fn on_span_received(&self, payload: &[u8]) -> Result<(), BridgeError> {
        let span = SpanRecord::from_payload(payload)?;
        self.metrics.record_received();
        tracing::info!(span_name = %span.name, "received span");

        let connection = match self.connection.ensure_connected() {
            Ok(connection) => connection,
            Err(ConnectError::Config(e)) => return Err(e.into()),
            // Already logged when the manager reached FailedInit.
            Err(ConnectError::NotConfigured | ConnectError::StartFailed(_)) => return Ok(()),
        };

        self.forwarder.forward(&connection, &span);
        Ok(())
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.connection.phase()
    }

    /// Port of the established connection, if any.
    pub fn port(&self) -> Option<u16> {
        self.connection.connection().map(|c| c.port())
    }

    pub fn metrics(&self) -> &Arc<BridgeMetrics> {
        &self.metrics
    }

    /// Stops the strategy, giving queued messages up to the send timeout to
    /// drain, then shuts the runtime down.
    pub fn shutdown(self) {
        if let Some(connection) = self.connection.connection() {
            let strategy = Arc::clone(connection.strategy());
            let drained = self
                .runtime
                .block_on(async { tokio::time::timeout(self.send_timeout, strategy.shutdown()).await });
            if drained.is_err() {
                tracing::warn!(timeout = ?self.send_timeout, "diagnostics strategy did not drain before shutdown");
            }
        }

        let Self {
            connection, runtime, ..
        } = self;
        drop(connection);
        runtime.shutdown_timeout(Duration::from_secs(1));
    }
}
