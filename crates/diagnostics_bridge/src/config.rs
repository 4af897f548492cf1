//! Configuration for the bridge runtime and argument file location.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory under the storage root reserved for test-harness files.
pub const ON_DEVICE_PATH_INTERNAL_USE: &str = "googletest/internal_use/";

/// Name of the binary test argument file written by the harness.
pub const TEST_ARGS_FILE_NAME: &str = "test_args.dat";

/// Platform external storage root.
pub const DEFAULT_STORAGE_ROOT: &str = "/sdcard";

/// Configuration for a [`DiagnosticsBridge`](crate::DiagnosticsBridge).
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Root of external storage; the argument file lives beneath it.
    ///
    /// Default: `/sdcard`
    pub storage_root: PathBuf,

    /// Upper bound on how long a forwarding caller is blocked waiting for the
    /// outbound channel to accept a message.
    ///
    /// Default: 5s
    pub send_timeout: Duration,

    /// Worker threads of the background runtime that runs strategy tasks.
    ///
    /// Default: 2
    pub worker_threads: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            send_timeout: Duration::from_secs(5),
            worker_threads: 2,
        }
    }
}

impl BridgeConfig {
    /// Sets the storage root.
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    /// Sets the send timeout.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Sets the number of background worker threads (at least one).
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    /// Full path of the test argument file.
    pub fn args_file_path(&self) -> PathBuf {
        args_file_path(&self.storage_root)
    }
}

/// Resolves the argument file path beneath a storage root.
pub fn args_file_path(storage_root: &Path) -> PathBuf {
    storage_root
        .join(ON_DEVICE_PATH_INTERNAL_USE)
        .join(TEST_ARGS_FILE_NAME)
}
