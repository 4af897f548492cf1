//! Error types for the diagnostics bridge.
//!
//! Configuration corruption is loud: it propagates out of the ingest endpoint.
//! Everything that concerns delivery to the collector is recoverable and only
//! ever logged.

use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors reading the on-disk test argument file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The argument file exists but could not be read or decoded.
    #[error("not able to read from file: {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The port entry is present but is not a valid port number.
    #[error("malformed diagnostics server port: {value:?}")]
    MalformedPort {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Errors reported by a server strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    /// `send` was called before `start`.
    #[error("strategy has not been started")]
    NotStarted,

    /// `start` was called on a running strategy.
    #[error("strategy is already started")]
    AlreadyStarted,

    /// The strategy cannot bind to the given port.
    #[error("invalid port: {0}")]
    InvalidPort(u16),

    /// The outbound channel has been closed by the send loop.
    #[error("outbound channel is closed")]
    ChannelClosed,

    /// Transport-layer error (network, encoding)
    #[error("transport error: {0}")]
    Transport(String),
}

/// Outcome of a connection attempt that did not produce a connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// No diagnostics server port is configured for this process.
    #[error("no diagnostics server configured")]
    NotConfigured,

    /// Building or starting the strategy failed.
    #[error("connecting to the diagnostics service failed: {0}")]
    StartFailed(#[source] StrategyError),

    /// The argument file is corrupt.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ConnectError {
    /// Returns `true` if the error indicates broken diagnostics configuration.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Failure to deliver a single span message.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("send rejected: {0}")]
    Strategy(#[from] StrategyError),

    #[error("send did not complete within {0:?}")]
    Timeout(Duration),

    /// The spawned send task was cancelled or panicked.
    #[error("send task failed: {0}")]
    Task(String),

    /// Forwarding was attempted from inside an async runtime, where blocking
    /// on the send is not allowed.
    #[error("cannot block on a send from within an async runtime")]
    AsyncContext,
}

/// Errors decoding the inbound span payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The insert request carried no span entry.
    #[error("request carries no span payload")]
    MissingSpan,

    #[error("malformed span payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors surfaced through the ingest boundary.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The background runtime could not be created.
    #[error("failed to start background runtime: {0}")]
    Runtime(#[source] io::Error),
}
