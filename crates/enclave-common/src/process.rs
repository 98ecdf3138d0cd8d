//! Process launch descriptors and process output chunks.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Parameters for running a process inside a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Path of the executable, or a shell script when `args` is empty.
    pub path: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Environment variables.
    pub env: Vec<(String, String)>,
    /// Working directory; the user's home directory when unset.
    pub dir: Option<String>,
    /// Whether to run as root. Overridden by `user` when set.
    pub privileged: bool,
    /// Name of the user in the container to run as.
    pub user: Option<String>,
    /// Resource limits applied to the process.
    pub limits: ResourceLimits,
    /// Allocate a TTY for stdio.
    pub tty: Option<TtySpec>,
}

impl ProcessSpec {
    /// Runs `path` with no arguments, environment, or limits.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Sets the user the process runs as.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets whether the process runs as root.
    #[must_use]
    pub const fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }
}

/// TTY settings for a process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtySpec {
    /// Initial window size.
    pub window_size: Option<WindowSize>,
}

/// Terminal dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    /// Number of columns.
    pub columns: u32,
    /// Number of rows.
    pub rows: u32,
}

/// Per-process resource limits, see `getrlimit(2)`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#as: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fsize: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locks: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memlock: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msgqueue: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nice: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nofile: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nproc: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rss: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtprio: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sigpending: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<u64>,
}

/// Stdio stream a chunk of process output belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    /// Standard input echo.
    Stdin,
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => write!(f, "stdin"),
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Signal that can be delivered to a running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// SIGTERM.
    Terminate,
    /// SIGKILL.
    Kill,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminate => write!(f, "terminate"),
            Self::Kill => write!(f, "kill"),
        }
    }
}

/// One unit of a process output stream.
///
/// A stream carries any number of `Output` chunks followed by exactly one
/// `Exit` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessChunk {
    /// Bytes written by the process.
    Output {
        /// Stream the bytes were written to.
        source: StreamSource,
        /// Payload.
        data: Vec<u8>,
    },
    /// Terminal marker carrying the exit status.
    Exit {
        /// Exit status of the process.
        status: u32,
    },
}

impl ProcessChunk {
    /// Returns the exit status if this is the terminal chunk.
    #[must_use]
    pub const fn exit_status(&self) -> Option<u32> {
        match self {
            Self::Exit { status } => Some(*status),
            Self::Output { .. } => None,
        }
    }

    /// Returns the payload if this is an output chunk.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Output { data, .. } => Some(data),
            Self::Exit { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_fields() {
        let spec = ProcessSpec::new("/bin/sh")
            .arg("-c")
            .arg("echo hi")
            .env("RUST_LOG", "debug")
            .dir("/tmp")
            .user("vcap");
        assert_eq!(spec.args, vec!["-c", "echo hi"]);
        assert_eq!(spec.env, vec![("RUST_LOG".into(), "debug".into())]);
        assert_eq!(spec.dir.as_deref(), Some("/tmp"));
        assert_eq!(spec.user.as_deref(), Some("vcap"));
        assert!(!spec.privileged);
    }

    #[test]
    fn chunk_accessors() {
        let out = ProcessChunk::Output {
            source: StreamSource::Stdout,
            data: b"hello\n".to_vec(),
        };
        assert_eq!(out.data(), Some(&b"hello\n"[..]));
        assert_eq!(out.exit_status(), None);

        let exit = ProcessChunk::Exit { status: 42 };
        assert_eq!(exit.exit_status(), Some(42));
        assert_eq!(exit.data(), None);
    }

    #[test]
    fn signals_serialize_by_name() {
        let json = serde_json::to_string(&[Signal::Terminate, Signal::Kill]).expect("serialize");
        assert_eq!(json, r#"["terminate","kill"]"#);
        assert_eq!(Signal::Kill.to_string(), "kill");
    }

    #[test]
    fn unset_rlimits_are_omitted() {
        let limits = ResourceLimits {
            nofile: Some(1024),
            ..ResourceLimits::default()
        };
        let json = serde_json::to_string(&limits).expect("serialize");
        assert_eq!(json, r#"{"nofile":1024}"#);
    }
}
