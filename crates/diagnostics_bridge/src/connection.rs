//! Lazy, exactly-once connection to the diagnostics collector.
//!
//! The state mutex is held across port resolution and strategy start, so
//! concurrent first callers serialize behind the one that performs the
//! transition and then observe its result.
//!
//! ```text
//! ┌───────────────┐  port resolved, start ok   ┌───────────┐
//! │ Uninitialized │ ─────────────────────────► │ Connected │
//! └───────────────┘                            └───────────┘
//!     │  ▲
//!     │  └── config error (state unchanged)
//!     │
//!     │  port unset / build or start failed    ┌────────────┐
//!     └──────────────────────────────────────► │ FailedInit │
//!                                              └────────────┘
//! ```

use crate::error::{ConnectError, StrategyError};
use crate::metrics::BridgeMetrics;
use crate::port::{PortResolver, INVALID_SERVER_PORT};
use crate::strategy::{ServerStrategy, StrategyFactory};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;

/// A started strategy and the port it was started with.
pub struct Connection<S> {
    port: u16,
    strategy: Arc<S>,
}

impl<S: ServerStrategy> Connection<S> {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn strategy(&self) -> &Arc<S> {
        &self.strategy
    }
}

/// Observable connection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Uninitialized,
    Connected,
    FailedInit,
}

/// Why initialization failed; cached for the rest of the process.
#[derive(Debug, Clone)]
enum InitFailure {
    NotConfigured,
    StartFailed(StrategyError),
}

impl InitFailure {
    fn to_error(&self) -> ConnectError {
        match self {
            Self::NotConfigured => ConnectError::NotConfigured,
            Self::StartFailed(e) => ConnectError::StartFailed(e.clone()),
        }
    }
}

enum ConnectionState<S> {
    Uninitialized,
    Connected(Arc<Connection<S>>),
    FailedInit(InitFailure),
}

/// Owns the single outbound connection.
pub struct ConnectionManager<F: StrategyFactory> {
    resolver: PortResolver,
    factory: F,
    runtime: Handle,
    state: Mutex<ConnectionState<F::Strategy>>,
    metrics: Arc<BridgeMetrics>,
}

impl<F: StrategyFactory> ConnectionManager<F> {
    pub fn new(resolver: PortResolver, factory: F, runtime: Handle, metrics: Arc<BridgeMetrics>) -> Self {
        Self {
            resolver,
            factory,
            runtime,
            state: Mutex::new(ConnectionState::Uninitialized),
            metrics,
        }
    }

    /// Returns the current phase without triggering initialization.
    pub fn phase(&self) -> ConnectionPhase {
        match *self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            ConnectionState::Uninitialized => ConnectionPhase::Uninitialized,
            ConnectionState::Connected(_) => ConnectionPhase::Connected,
            ConnectionState::FailedInit(_) => ConnectionPhase::FailedInit,
        }
    }

    /// Returns the established connection, if any, without triggering
    /// initialization.
    pub fn connection(&self) -> Option<Arc<Connection<F::Strategy>>> {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            ConnectionState::Connected(connection) => Some(Arc::clone(connection)),
            _ => None,
        }
    }

    /// Connects on first use and returns the cached outcome afterwards.
    ///
    /// Only [`ConnectError::Config`] leaves the manager uninitialized; every
    /// other outcome is final for the lifetime of the manager.
    pub fn ensure_connected(&self) -> Result<Arc<Connection<F::Strategy>>, ConnectError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        match &*state {
            ConnectionState::Connected(connection) => return Ok(Arc::clone(connection)),
            ConnectionState::FailedInit(failure) => return Err(failure.to_error()),
            ConnectionState::Uninitialized => {}
        }

        self.metrics.record_port_resolution();
        let port = self.resolver.resolve_port()?;

        if port == INVALID_SERVER_PORT {
            tracing::debug!(
                args_file = %self.resolver.args_file().display(),
                "no diagnostics server port configured, forwarding disabled"
            );
            *state = ConnectionState::FailedInit(InitFailure::NotConfigured);
            return Err(ConnectError::NotConfigured);
        }

        match self.start(port) {
            Ok(connection) => {
                tracing::info!(port, strategy = connection.strategy.name(), "started diagnostics server strategy");
                *state = ConnectionState::Connected(Arc::clone(&connection));
                Ok(connection)
            }
            Err(e) => {
                tracing::warn!(port, error = %e, "connecting to the diagnostics service resulted in an error");
                *state = ConnectionState::FailedInit(InitFailure::StartFailed(e.clone()));
                Err(ConnectError::StartFailed(e))
            }
        }
    }

    /// Builds and starts the strategy. A panic in either step is reported as
    /// a start failure.
    fn start(&self, port: u16) -> Result<Arc<Connection<F::Strategy>>, StrategyError> {
        let strategy = panic::catch_unwind(AssertUnwindSafe(|| -> Result<F::Strategy, StrategyError> {
            let strategy = self.factory.build(&self.runtime)?;
            strategy.start(port)?;
            Ok(strategy)
        }))
        .map_err(|payload| StrategyError::Transport(format!("strategy panicked: {}", panic_message(&*payload))))??;
        self.metrics.record_strategy_started();

        Ok(Arc::new(Connection {
            port,
            strategy: Arc::new(strategy),
        }))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
