//! Diagnostics server port resolution from the harness argument file.

use crate::args::TestArguments;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Sentinel meaning "no diagnostics server configured".
pub const INVALID_SERVER_PORT: u16 = 0;

/// Port used when the harness explicitly passes the sentinel.
pub const DEFAULT_SERVER_PORT: u16 = 64676;

/// Argument name carrying the port.
pub const SERVER_PORT_ARG: &str = "diagnosticsServerPort";

/// Reads the diagnostics server port out of the test argument file.
#[derive(Debug, Clone)]
pub struct PortResolver {
    args_file: PathBuf,
}

impl PortResolver {
    pub fn new(args_file: impl Into<PathBuf>) -> Self {
        Self {
            args_file: args_file.into(),
        }
    }

    pub fn args_file(&self) -> &Path {
        &self.args_file
    }

    /// Resolves the port.
    ///
    /// A missing file or missing entry yields [`INVALID_SERVER_PORT`]. An entry
    /// holding the sentinel itself maps to [`DEFAULT_SERVER_PORT`].
    pub fn resolve_port(&self) -> Result<u16, ConfigError> {
        let exists = self.args_file.try_exists().map_err(|source| ConfigError::ConfigRead {
            path: self.args_file.clone(),
            source,
        })?;
        if !exists {
            return Ok(INVALID_SERVER_PORT);
        }

        let args = TestArguments::read_from(&self.args_file).map_err(|source| ConfigError::ConfigRead {
            path: self.args_file.clone(),
            source,
        })?;

        port_from_args(&args)
    }
}

/// Applies the port rules to a decoded argument list.
pub fn port_from_args(args: &TestArguments) -> Result<u16, ConfigError> {
    let Some(value) = args.find(SERVER_PORT_ARG) else {
        return Ok(INVALID_SERVER_PORT);
    };

    let port = value.parse::<u16>().map_err(|source| ConfigError::MalformedPort {
        value: value.to_string(),
        source,
    })?;

    if port == INVALID_SERVER_PORT {
        Ok(DEFAULT_SERVER_PORT)
    } else {
        Ok(port)
    }
}
