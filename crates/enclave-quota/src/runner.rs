//! Execution of external commands.

use std::ffi::OsStr;
use std::io;
use std::process::{Command, Output, Stdio};

/// Runs a prepared command to completion.
///
/// Implementations must capture standard output and standard error. Pipes
/// belong to the returned [`Output`] or are closed before returning, so no
/// descriptor outlives the call.
pub trait CommandRunner: Send + Sync {
    /// Runs `command` and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or awaited. A
    /// non-zero exit is not an error at this level.
    fn run(&self, command: &mut Command) -> io::Result<Output>;
}

/// Runs commands on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &mut Command) -> io::Result<Output> {
        tracing::debug!(command = %describe(command), "running command");
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
    }
}

/// Renders a command as `program arg...` for diagnostics.
pub fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}
