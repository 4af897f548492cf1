//! Stream-socket server strategy.
//!
//! `start` creates the outbound channel and spawns a send loop on the bridge's
//! runtime. The loop connects to `host:port` and writes each message as a
//! length-delimited protobuf frame. When the loop exits (connect failure, write
//! failure) the receiver is dropped and later sends fail with
//! [`StrategyError::ChannelClosed`].

use crate::error::StrategyError;
use crate::strategy::ServerStrategy;
use crate::wire::SpanMessage;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Configuration for [`TcpStrategy`].
#[derive(Debug, Clone)]
pub struct TcpStrategyConfig {
    /// Collector host.
    ///
    /// Default: `127.0.0.1`
    pub host: String,

    /// Capacity of the outbound channel; senders wait when it is full.
    ///
    /// Default: 1024
    pub channel_capacity: usize,

    /// How long the send loop waits for the collector to accept the connection.
    ///
    /// Default: 10s
    pub connect_timeout: Duration,
}

impl Default for TcpStrategyConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            channel_capacity: 1024,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl TcpStrategyConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

enum TcpState {
    Idle,
    Running {
        span_messages: mpsc::Sender<SpanMessage>,
        task: JoinHandle<()>,
    },
    Stopped,
}

/// Strategy that streams span messages to a collector over TCP.
pub struct TcpStrategy {
    config: TcpStrategyConfig,
    runtime: Handle,
    state: Mutex<TcpState>,
}

impl TcpStrategy {
    pub fn new(config: TcpStrategyConfig, runtime: Handle) -> Self {
        Self {
            config,
            runtime,
            state: Mutex::new(TcpState::Idle),
        }
    }

    /// Factory suitable for [`DiagnosticsBridge::new`](crate::DiagnosticsBridge::new).
    pub fn factory(
        config: TcpStrategyConfig,
    ) -> impl Fn(&Handle) -> Result<TcpStrategy, StrategyError> + Send + Sync {
        move |runtime: &Handle| Ok(TcpStrategy::new(config.clone(), runtime.clone()))
    }

    fn lock_state(&self) -> MutexGuard<'_, TcpState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ServerStrategy for TcpStrategy {
    fn start(&self, port: u16) -> Result<(), StrategyError> {
        if port == 0 {
            return Err(StrategyError::InvalidPort(port));
        }

        let mut state = self.lock_state();
        if !matches!(*state, TcpState::Idle) {
            return Err(StrategyError::AlreadyStarted);
        }

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let host = self.config.host.clone();
        let connect_timeout = self.config.connect_timeout;
        let task = self.runtime.spawn(async move {
            match send_loop(&host, port, connect_timeout, rx).await {
                Ok(sent) => tracing::debug!(sent, "diagnostics send loop finished"),
                Err(e) => tracing::warn!(error = %e, host = %host, port, "diagnostics send loop stopped"),
            }
        });

        *state = TcpState::Running {
            span_messages: tx,
            task,
        };
        Ok(())
    }

    async fn send(&self, message: SpanMessage) -> Result<(), StrategyError> {
        // Clone the sender so the lock is not held while waiting for capacity.
        let tx = match &*self.lock_state() {
            TcpState::Idle => return Err(StrategyError::NotStarted),
            TcpState::Running { span_messages, .. } => span_messages.clone(),
            TcpState::Stopped => return Err(StrategyError::ChannelClosed),
        };

        tx.send(message)
            .await
            .map_err(|_| StrategyError::ChannelClosed)
    }

    async fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), TcpState::Stopped);
        if let TcpState::Running { span_messages, task } = previous {
            // Dropping the last sender lets the loop drain and exit.
            drop(span_messages);
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "diagnostics send loop task failed");
            }
        }
    }

    fn name(&self) -> &str {
        "tcp"
    }
}

/// Drains the channel into the socket. Returns the number of frames written.
async fn send_loop(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    mut rx: mpsc::Receiver<SpanMessage>,
) -> Result<u64, StrategyError> {
    let mut stream = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| StrategyError::Transport(format!("connect to {host}:{port} timed out")))?
        .map_err(|e| StrategyError::Transport(e.to_string()))?;
    stream.set_nodelay(true).map_err(|e| StrategyError::Transport(e.to_string()))?;

    let mut sent = 0u64;
    while let Some(message) = rx.recv().await {
        stream
            .write_all(&message.to_frame())
            .await
            .map_err(|e| StrategyError::Transport(e.to_string()))?;
        sent += 1;
    }

    stream.shutdown().await.map_err(|e| StrategyError::Transport(e.to_string()))?;
    Ok(sent)
}
