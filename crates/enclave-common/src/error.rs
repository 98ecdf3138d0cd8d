//! Errors raised by the shared model and configuration loading.
//!
//! The client and quota crates keep their own error enums and wrap this one
//! where a failure originates here.

use std::path::PathBuf;

use thiserror::Error;

/// Failure in configuration handling or value parsing.
#[derive(Debug, Error)]
pub enum EnclaveError {
    /// A configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is unusable.
    #[error("invalid configuration: {message}")]
    Config {
        /// What is wrong with it.
        message: String,
    },

    /// A network or address range does not parse.
    #[error("invalid network {network:?}: {reason}")]
    InvalidNetwork {
        /// Text that was parsed.
        network: String,
        /// Which part is malformed.
        reason: &'static str,
    },

    /// A configuration file is not valid JSON for its model.
    #[error("malformed configuration: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias over [`EnclaveError`].
pub type Result<T> = std::result::Result<T, EnclaveError>;
