use thiserror::Error;

use crate::common::error::HadoopError::{ConfigurationError, GenericError};

#[derive(Debug, Error)]
pub enum HadoopError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Host `{host}` cannot be reached by password-less ssh: {reason}")]
    ConnectivityError { host: String, reason: String },
    #[error(
        "No free port found in range {start}-{end} ({found} of {required} ports were allocated)"
    )]
    PortExhaustionError {
        start: u16,
        end: u16,
        found: usize,
        required: usize,
    },
    #[error("Daemon control failed: {0}")]
    DaemonControlError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Error: {0}")]
    GenericError(String),
}

impl HadoopError {
    /// Process exit code used when this error terminates the run.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl From<serde_json::error::Error> for HadoopError {
    fn from(e: serde_json::error::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

impl From<anyhow::Error> for HadoopError {
    fn from(error: anyhow::Error) -> Self {
        Self::GenericError(format!("{error:?}"))
    }
}

impl From<walkdir::Error> for HadoopError {
    fn from(error: walkdir::Error) -> Self {
        match error.into_io_error() {
            Some(error) => Self::IoError(error),
            None => Self::GenericError("Filesystem loop detected while walking a directory".into()),
        }
    }
}

impl From<String> for HadoopError {
    fn from(e: String) -> Self {
        GenericError(e)
    }
}

pub fn error<T>(message: String) -> crate::Result<T> {
    Err(GenericError(message))
}

pub fn configuration_error<T>(message: String) -> crate::Result<T> {
    Err(ConfigurationError(message))
}
