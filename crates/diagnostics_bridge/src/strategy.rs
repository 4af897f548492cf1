use crate::error::StrategyError;
use crate::wire::SpanMessage;
use std::future::Future;
use tokio::runtime::Handle;

/// The collaborator that runs the diagnostics network layer.
///
/// Uses native async fn in traits instead of `#[async_trait]`. The bridge only
/// ever holds a concrete strategy type, so no boxed variant is needed.
pub trait ServerStrategy: Send + Sync + 'static {
    /// Starts the network layer against the given port.
    ///
    /// Called at most once per strategy instance by the bridge.
    fn start(&self, port: u16) -> Result<(), StrategyError>;

    /// Enqueues a message on the outbound channel, waiting for capacity.
    fn send(&self, message: SpanMessage) -> impl Future<Output = Result<(), StrategyError>> + Send;

    /// Closes the outbound channel and waits for queued messages to drain.
    fn shutdown(&self) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Returns the strategy name for debugging.
    fn name(&self) -> &str;
}

/// Builds a strategy bound to the bridge's background runtime.
///
/// Any `Fn(&Handle) -> Result<S, StrategyError>` closure is a factory.
pub trait StrategyFactory: Send + Sync {
    type Strategy: ServerStrategy;

    fn build(&self, runtime: &Handle) -> Result<Self::Strategy, StrategyError>;
}

impl<S, F> StrategyFactory for F
where
    S: ServerStrategy,
    F: Fn(&Handle) -> Result<S, StrategyError> + Send + Sync,
{
    type Strategy = S;

    fn build(&self, runtime: &Handle) -> Result<S, StrategyError> {
        self(runtime)
    }
}

/// Recording strategy for tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Shared call log so tests can observe strategies built inside the bridge.
    #[derive(Default)]
    pub(crate) struct CallLog {
        pub(crate) builds: AtomicUsize,
        pub(crate) starts: Mutex<Vec<u16>>,
        pub(crate) sent: Mutex<Vec<SpanMessage>>,
    }

    impl CallLog {
        pub(crate) fn builds(&self) -> usize {
            self.builds.load(Ordering::SeqCst)
        }

        pub(crate) fn starts(&self) -> Vec<u16> {
            self.starts.lock().unwrap().clone()
        }

        pub(crate) fn sent(&self) -> Vec<SpanMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[derive(Clone, Copy, Default)]
    pub(crate) enum Behavior {
        #[default]
        Accept,
        FailStart,
        PanicStart,
        FailSend,
        Hang,
        Panic,
    }

    pub(crate) struct RecordingStrategy {
        log: Arc<CallLog>,
        behavior: Behavior,
    }

    impl ServerStrategy for RecordingStrategy {
        fn start(&self, port: u16) -> Result<(), StrategyError> {
            self.log.starts.lock().unwrap().push(port);
            match self.behavior {
                Behavior::FailStart => Err(StrategyError::Transport("connection refused".to_string())),
                Behavior::PanicStart => panic!("strategy start panicked"),
                _ => Ok(()),
            }
        }

        async fn send(&self, message: SpanMessage) -> Result<(), StrategyError> {
            match self.behavior {
                Behavior::FailSend => Err(StrategyError::ChannelClosed),
                Behavior::Hang => std::future::pending().await,
                Behavior::Panic => panic!("strategy send panicked"),
                _ => {
                    self.log.sent.lock().unwrap().push(message);
                    Ok(())
                }
            }
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    /// Returns a factory producing recording strategies plus their shared log.
    pub(crate) fn recording_factory(
        behavior: Behavior,
    ) -> (
        impl Fn(&Handle) -> Result<RecordingStrategy, StrategyError> + Send + Sync,
        Arc<CallLog>,
    ) {
        let log = Arc::new(CallLog::default());
        let factory_log = Arc::clone(&log);
        let factory = move |_: &Handle| {
            factory_log.builds.fetch_add(1, Ordering::SeqCst);
            Ok(RecordingStrategy {
                log: Arc::clone(&factory_log),
                behavior,
            })
        };
        (factory, log)
    }
}
