//! Quota backend errors.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failure of a quota operation.
#[derive(Debug, Error)]
pub enum QuotaError {
    /// The external tool could not be started.
    #[error("failed to launch {tool}: {source}")]
    Launch {
        /// Tool that was invoked.
        tool: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The external tool exited unsuccessfully.
    #[error("{tool} failed with {status}: {stderr}")]
    ToolFailed {
        /// Tool that was invoked.
        tool: String,
        /// Exit status of the tool.
        status: ExitStatus,
        /// Captured standard error.
        stderr: String,
    },

    /// The tool output could not be interpreted.
    #[error("unexpected {tool} output {output:?}: {reason}")]
    Parse {
        /// Tool that produced the output.
        tool: String,
        /// Offending output.
        output: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No mount point could be determined for the depot.
    #[error("no mount point found for {path}")]
    MountNotFound {
        /// Depot path that was looked up.
        path: PathBuf,
    },
}

/// Convenience alias for quota results.
pub type Result<T> = std::result::Result<T, QuotaError>;
