//! Diagnostics Bridge
//!
//! Relays trace spans from a test process to an out-of-process diagnostics
//! collector. Spans arrive one at a time over a synchronous IPC boundary; the
//! first one triggers port resolution from the harness argument file and a
//! one-time start of the server strategy. Every span is then translated to its
//! wire form and pushed onto the strategy's outbound channel.
//!
//! Delivery is best-effort: a missing configuration, a failed start or a failed
//! send never reaches the caller. Only a corrupt payload or a corrupt argument
//! file does.
//!
//! # Example
//!
//! ```ignore
//! use diagnostics_bridge::{BridgeConfig, DiagnosticsBridge, TcpStrategy, TcpStrategyConfig};
//!
//! let bridge = DiagnosticsBridge::new(
//!     BridgeConfig::default(),
//!     TcpStrategy::factory(TcpStrategyConfig::default()),
//! )?;
//!
//! // Called from whichever thread the host delivers the span on.
//! bridge.on_span_received(&payload)?;
//! ```

pub mod args;
pub mod bridge;
pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod forwarder;
pub mod metrics;
pub mod port;
pub mod span;
pub mod strategy;
pub mod tcp;
pub mod wire;

// Re-export main types
pub use args::{TestArgument, TestArguments};
pub use bridge::DiagnosticsBridge;
pub use config::BridgeConfig;
pub use connection::{Connection, ConnectionManager, ConnectionPhase};
pub use endpoint::{ContentValues, DiagnosticsProvider, SPAN_PAYLOAD_KEY};
pub use error::{BridgeError, ConfigError, ConnectError, ForwardError, PayloadError, StrategyError};
pub use forwarder::SpanForwarder;
pub use metrics::BridgeMetrics;
pub use port::{PortResolver, DEFAULT_SERVER_PORT, INVALID_SERVER_PORT, SERVER_PORT_ARG};
pub use span::{AttributeValue, SpanKind, SpanRecord, SpanStatus};
pub use strategy::{ServerStrategy, StrategyFactory};
pub use tcp::{TcpStrategy, TcpStrategyConfig};
pub use wire::SpanMessage;
