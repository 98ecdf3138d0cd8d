//! Domain primitive types shared by the client and its callers.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a container, stable for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// Creates a handle from a string value.
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Handle {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Handle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Named container properties. An empty map used as a filter matches everything.
pub type Properties = HashMap<String, String>;

/// Host-wide capacity reported by the control endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    /// Total memory available to containers.
    pub memory_in_bytes: u64,
    /// Total disk available to containers.
    pub disk_in_bytes: u64,
    /// Maximum number of containers the host accepts.
    pub max_containers: u64,
}

/// Access mode of a bind mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMountMode {
    /// Read-only mount.
    #[default]
    Ro,
    /// Read-write mount.
    Rw,
}

/// Side on which the source path of a bind mount lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMountOrigin {
    /// Source path is on the host.
    #[default]
    Host,
    /// Source path is inside the container.
    Container,
}

/// A directory mounted into a container at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindMount {
    /// Source path.
    pub src_path: String,
    /// Destination path inside the container.
    pub dst_path: String,
    /// Access mode.
    pub mode: BindMountMode,
    /// Where `src_path` is resolved.
    pub origin: BindMountOrigin,
}

/// Parameters for creating a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Requested handle; the endpoint generates one when unset.
    pub handle: Option<Handle>,
    /// Root filesystem path or URI.
    pub rootfs_path: Option<String>,
    /// Idle time after which the container is destroyed.
    pub grace_time: Option<Duration>,
    /// Network (CIDR) the container address is allocated from.
    pub network: Option<String>,
    /// Bind mounts applied at creation.
    pub bind_mounts: Vec<BindMount>,
    /// Initial properties.
    pub properties: Properties,
    /// Environment applied to every process, as `KEY=VALUE` strings.
    pub env: Vec<String>,
}

/// A host port forwarded to a container port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortMapping {
    /// Port on the host.
    pub host_port: u32,
    /// Port inside the container.
    pub container_port: u32,
}

/// Memory cgroup counters of a container.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStat {
    pub cache: u64,
    pub rss: u64,
    pub mapped_file: u64,
    pub pgpgin: u64,
    pub pgpgout: u64,
    pub swap: u64,
    pub pgfault: u64,
    pub pgmajfault: u64,
    pub inactive_anon: u64,
    pub active_anon: u64,
    pub inactive_file: u64,
    pub active_file: u64,
    pub unevictable: u64,
    pub hierarchical_memory_limit: u64,
    pub hierarchical_memsw_limit: u64,
    pub total_cache: u64,
    pub total_rss: u64,
    pub total_mapped_file: u64,
    pub total_pgpgin: u64,
    pub total_pgpgout: u64,
    pub total_swap: u64,
    pub total_pgfault: u64,
    pub total_pgmajfault: u64,
    pub total_inactive_anon: u64,
    pub total_active_anon: u64,
    pub total_inactive_file: u64,
    pub total_active_file: u64,
    pub total_unevictable: u64,
}

/// CPU accounting of a container, in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuStat {
    /// Total CPU time.
    pub usage: u64,
    /// Time spent in user mode.
    pub user: u64,
    /// Time spent in kernel mode.
    pub system: u64,
}

/// Disk usage of a container as reported by the quota subsystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskStat {
    /// Space in use.
    pub bytes_used: u64,
    /// Inodes in use.
    pub inodes_used: u64,
}

/// Current traffic shaping of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandwidthStat {
    /// Inbound rate in bytes per second.
    pub in_rate: u64,
    /// Inbound burst in bytes.
    pub in_burst: u64,
    /// Outbound rate in bytes per second.
    pub out_rate: u64,
    /// Outbound burst in bytes.
    pub out_burst: u64,
}

/// Snapshot of a container produced by a single `info` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Either `active` or `stopped`.
    pub state: String,
    /// Events recorded for the container, such as `oom`.
    pub events: Vec<String>,
    /// Gateway address of the host side of the virtual ethernet pair.
    pub host_ip: String,
    /// Address of the container side of the virtual ethernet pair.
    pub container_ip: String,
    /// Externally reachable address of the host.
    pub external_ip: String,
    /// Directory holding the container's control scripts and filesystem.
    pub container_path: String,
    /// IDs of the processes running in the container.
    pub process_ids: Vec<u32>,
    /// Properties defined on the container.
    pub properties: Properties,
    /// Active port forwards.
    pub mapped_ports: Vec<PortMapping>,
    /// Memory counters.
    pub memory_stat: MemoryStat,
    /// CPU counters.
    pub cpu_stat: CpuStat,
    /// Disk usage.
    pub disk_stat: DiskStat,
    /// Bandwidth shaping.
    pub bandwidth_stat: BandwidthStat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_display_and_conversion() {
        let handle = Handle::from("web-1");
        assert_eq!(handle.to_string(), "web-1");
        assert_eq!(handle.as_str(), "web-1");
    }

    #[test]
    fn handle_serializes_as_plain_string() {
        let json = serde_json::to_string(&Handle::new("abc")).expect("serialize");
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn stats_default_missing_fields() {
        let stat: DiskStat = serde_json::from_str(r#"{ "bytes_used": 12 }"#).expect("parse");
        assert_eq!(stat.bytes_used, 12);
        assert_eq!(stat.inodes_used, 0);
    }
}
