//! Request and response messages, one pair per operation.
//!
//! Limit requests double as queries: a request carrying only the handle asks
//! for the current value, a request with value fields populated sets them.
//! Both are answered with the same response message.

use enclave_common::net::{IcmpControl, NetworkRange, PortRange, Protocol};
use enclave_common::process::{ResourceLimits, Signal, StreamSource, TtySpec};
use enclave_common::types::{
    BandwidthStat, BindMount, CpuStat, DiskStat, Handle, MemoryStat, PortMapping, Properties,
};
use serde::{Deserialize, Serialize};

/// A response frame: either the typed response or a domain error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply<T> {
    /// The endpoint rejected the request.
    Error {
        /// Error details.
        error: ErrorResponse,
    },
    /// The endpoint handled the request.
    Ok(T),
}

impl<T> Reply<T> {
    /// Converts the reply into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the [`ErrorResponse`] if the endpoint reported a domain error.
    pub fn into_result(self) -> Result<T, ErrorResponse> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Error { error } => Err(error),
        }
    }
}

/// Domain error raised by the endpoint inside a well-formed response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub message: String,
    /// Extra context attached by the endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Endpoint-side backtrace.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub backtrace: Vec<String>,
}

impl ErrorResponse {
    /// Creates an error with only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// A key/value pair; the wire form of [`Properties`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Property name.
    pub key: String,
    /// Property value.
    pub value: String,
}

/// Flattens a property map into pairs, sorted by key.
#[must_use]
pub fn properties_to_wire(properties: &Properties) -> Vec<Property> {
    let mut pairs: Vec<Property> = properties
        .iter()
        .map(|(key, value)| Property {
            key: key.clone(),
            value: value.clone(),
        })
        .collect();
    pairs.sort_by(|a, b| a.key.cmp(&b.key));
    pairs
}

/// Folds pairs into a property map. A repeated key keeps its last value.
#[must_use]
pub fn properties_from_wire(pairs: Vec<Property>) -> Properties {
    pairs.into_iter().map(|p| (p.key, p.value)).collect()
}

/// Health check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRequest {}

/// Health check answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {}

/// Host capacity query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityRequest {}

/// Host capacity.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_in_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_in_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_containers: Option<u64>,
}

/// Container creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateRequest {
    /// Requested handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
    /// Root filesystem path or URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rootfs: Option<String>,
    /// Grace time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_time: Option<u64>,
    /// Network the container address is allocated from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Bind mounts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bind_mounts: Vec<BindMount>,
    /// Initial properties.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    /// Container-wide environment as `KEY=VALUE`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
}

/// Handle of the created container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateResponse {
    /// Assigned handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
}

/// Container destruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyRequest {
    /// Target container.
    pub handle: Handle,
}

/// Destruction acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyResponse {}

/// Stop every process in a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRequest {
    /// Target container.
    pub handle: Handle,
    /// Return before the processes have exited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
    /// Send SIGKILL instead of SIGTERM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill: Option<bool>,
}

/// Stop acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopResponse {}

/// Container listing, optionally filtered by properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListRequest {
    /// Properties a container must carry to be listed. Empty lists everything.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
}

/// Matching handles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListResponse {
    /// Handles of matching containers.
    pub handles: Vec<Handle>,
}

/// Container snapshot query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoRequest {
    /// Target container.
    pub handle: Handle,
}

/// Container snapshot.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub process_ids: Vec<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mapped_ports: Vec<PortMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_stat: Option<MemoryStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_stat: Option<CpuStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_stat: Option<DiskStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth_stat: Option<BandwidthStat>,
}

/// Acknowledgement of a raw upload into a container.
///
/// The upload itself travels unframed, with handle and destination in the
/// query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInResponse {}

/// Bandwidth limit query or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitBandwidthRequest {
    /// Target container.
    pub handle: Handle,
    /// Rate in bytes per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<u64>,
    /// Burst in bytes per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst: Option<u64>,
}

/// Effective bandwidth limits.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitBandwidthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burst: Option<u64>,
}

/// CPU limit query or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitCpuRequest {
    /// Target container.
    pub handle: Handle,
    /// CPU shares.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_in_shares: Option<u64>,
}

/// Effective CPU limits.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitCpuResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_in_shares: Option<u64>,
}

/// Disk limit query or update.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitDiskRequest {
    /// Target container.
    pub handle: Handle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_soft: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hard: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inode_soft: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inode_hard: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_soft: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_hard: Option<u64>,
}

/// Effective disk limits.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitDiskResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_soft: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_hard: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inode_soft: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inode_hard: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_soft: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_hard: Option<u64>,
}

/// Memory limit query or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitMemoryRequest {
    /// Target container.
    pub handle: Handle,
    /// Limit in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_in_bytes: Option<u64>,
}

/// Effective memory limits.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitMemoryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_in_bytes: Option<u64>,
}

/// An environment variable of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    /// Variable name.
    pub key: String,
    /// Variable value.
    pub value: String,
}

/// Process launch. Answered by a stream of [`ProcessPayload`] frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Target container.
    pub handle: Handle,
    /// Executable or script.
    pub path: String,
    /// Arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvironmentVariable>,
    /// Working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Run as root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,
    /// User to run as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Resource limits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rlimits: Option<ResourceLimits>,
    /// TTY allocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tty: Option<TtySpec>,
}

/// Re-attach to the output of a running process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachRequest {
    /// Target container.
    pub handle: Handle,
    /// Process to attach to.
    pub process_id: u32,
}

/// One frame of a process stream.
///
/// The first frame answering a run carries only `process_id`. Output frames
/// carry `source` and `data`; the final frame carries `exit_status`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<StreamSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<u32>,
}

impl ProcessPayload {
    /// Frame announcing the ID of a newly started process.
    #[must_use]
    pub fn started(process_id: u32) -> Self {
        Self {
            process_id: Some(process_id),
            ..Self::default()
        }
    }

    /// Output frame.
    #[must_use]
    pub fn output(source: StreamSource, data: &[u8]) -> Self {
        Self {
            source: Some(source),
            data: Some(data.to_vec()),
            ..Self::default()
        }
    }

    /// Terminal frame.
    #[must_use]
    pub fn exit(status: u32) -> Self {
        Self {
            exit_status: Some(status),
            ..Self::default()
        }
    }
}

/// Deliver a signal to a running process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRequest {
    /// Target container.
    pub handle: Handle,
    /// Process to signal.
    pub process_id: u32,
    /// Signal to deliver.
    pub signal: Signal,
}

/// Signal acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalResponse {}

/// Change the TTY of a running process, e.g. after a terminal resize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTtyRequest {
    /// Target container.
    pub handle: Handle,
    /// Process whose TTY changes.
    pub process_id: u32,
    /// New TTY settings.
    pub tty: TtySpec,
}

/// TTY change acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTtyResponse {}

/// Forward a host port to a container port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetInRequest {
    /// Target container.
    pub handle: Handle,
    /// Host port; acquired from the endpoint's pool when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u32>,
    /// Container port; same as the host port when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_port: Option<u32>,
}

/// The forward that was set up.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetInResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_port: Option<u32>,
}

/// Whitelist outbound traffic. Carries a rule in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetOutRequest {
    /// Target container.
    pub handle: Handle,
    /// Protocol matched.
    pub protocol: Protocol,
    /// Destination addresses.
    pub network: NetworkRange,
    /// Destination ports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<PortRange>,
    /// ICMP selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icmp: Option<IcmpControl>,
    /// Log matching connections.
    #[serde(default)]
    pub log: bool,
}

/// Whitelist acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetOutResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_request_carries_only_handle() {
        let req = LimitDiskRequest {
            handle: Handle::new("c1"),
            block_soft: None,
            block_hard: None,
            inode_soft: None,
            inode_hard: None,
            byte_soft: None,
            byte_hard: None,
        };
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json, serde_json::json!({ "handle": "c1" }));
    }

    #[test]
    fn zero_is_sent_while_unset_is_omitted() {
        let req = LimitMemoryRequest {
            handle: Handle::new("c1"),
            limit_in_bytes: Some(0),
        };
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json, serde_json::json!({ "handle": "c1", "limit_in_bytes": 0 }));
    }

    #[test]
    fn properties_fold_to_unique_keys() {
        let props = properties_from_wire(vec![
            Property {
                key: "a".into(),
                value: "1".into(),
            },
            Property {
                key: "b".into(),
                value: "2".into(),
            },
            Property {
                key: "a".into(),
                value: "3".into(),
            },
        ]);
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("a").map(String::as_str), Some("3"));
    }

    #[test]
    fn properties_flatten_sorted() {
        let mut props = Properties::new();
        let _ = props.insert("zone".into(), "b".into());
        let _ = props.insert("app".into(), "web".into());
        let pairs = properties_to_wire(&props);
        assert_eq!(pairs[0].key, "app");
        assert_eq!(pairs[1].key, "zone");
    }

    #[test]
    fn signal_request_names_the_signal() {
        let req = SignalRequest {
            handle: Handle::new("c1"),
            process_id: 7,
            signal: Signal::Terminate,
        };
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "handle": "c1", "process_id": 7, "signal": "terminate" })
        );
    }

    #[test]
    fn error_frame_wins_over_empty_response() {
        let reply: Reply<PingResponse> =
            serde_json::from_str(r#"{ "error": { "message": "boom" } }"#).expect("parse");
        assert_eq!(reply.into_result().expect_err("error"), ErrorResponse::new("boom"));
    }

    #[test]
    fn empty_object_is_ok_reply() {
        let reply: Reply<PingResponse> = serde_json::from_str("{}").expect("parse");
        assert_eq!(reply, Reply::Ok(PingResponse {}));
    }
}
