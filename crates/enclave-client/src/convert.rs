//! Translation between domain values and wire messages.
//!
//! Each limit kind has exactly one request builder and one response decoder,
//! shared by its get and set operations.

use enclave_common::limits::{BandwidthLimits, CpuLimits, DiskLimits, MemoryLimits};
use enclave_common::net::NetOutRule;
use enclave_common::process::{ProcessChunk, ProcessSpec, ResourceLimits, StreamSource};
use enclave_common::types::{Capacity, ContainerInfo, ContainerSpec, Handle};
use enclave_protocol::messages::{
    CapacityResponse, CreateRequest, EnvironmentVariable, InfoResponse, LimitBandwidthRequest,
    LimitBandwidthResponse, LimitCpuRequest, LimitCpuResponse, LimitDiskRequest,
    LimitDiskResponse, LimitMemoryRequest, LimitMemoryResponse, NetOutRequest, ProcessPayload,
    RunRequest, properties_from_wire, properties_to_wire,
};

pub fn capacity_from_wire(res: CapacityResponse) -> Capacity {
    Capacity {
        memory_in_bytes: res.memory_in_bytes.unwrap_or_default(),
        disk_in_bytes: res.disk_in_bytes.unwrap_or_default(),
        max_containers: res.max_containers.unwrap_or_default(),
    }
}

pub fn create_request(spec: &ContainerSpec) -> CreateRequest {
    CreateRequest {
        handle: spec.handle.clone(),
        rootfs: spec.rootfs_path.clone(),
        grace_time: spec.grace_time.map(|d| d.as_secs()),
        network: spec.network.clone(),
        bind_mounts: spec.bind_mounts.clone(),
        properties: properties_to_wire(&spec.properties),
        env: spec.env.clone(),
    }
}

pub fn info_from_wire(res: InfoResponse) -> ContainerInfo {
    ContainerInfo {
        state: res.state.unwrap_or_default(),
        events: res.events,
        host_ip: res.host_ip.unwrap_or_default(),
        container_ip: res.container_ip.unwrap_or_default(),
        external_ip: res.external_ip.unwrap_or_default(),
        container_path: res.container_path.unwrap_or_default(),
        process_ids: res.process_ids,
        properties: properties_from_wire(res.properties),
        mapped_ports: res.mapped_ports,
        memory_stat: res.memory_stat.unwrap_or_default(),
        cpu_stat: res.cpu_stat.unwrap_or_default(),
        disk_stat: res.disk_stat.unwrap_or_default(),
        bandwidth_stat: res.bandwidth_stat.unwrap_or_default(),
    }
}

pub fn bandwidth_request(handle: &Handle, limits: BandwidthLimits) -> LimitBandwidthRequest {
    LimitBandwidthRequest {
        handle: handle.clone(),
        rate: limits.rate_in_bytes_per_second,
        burst: limits.burst_rate_in_bytes_per_second,
    }
}

pub const fn bandwidth_from_wire(res: &LimitBandwidthResponse) -> BandwidthLimits {
    BandwidthLimits {
        rate_in_bytes_per_second: res.rate,
        burst_rate_in_bytes_per_second: res.burst,
    }
}

pub fn cpu_request(handle: &Handle, limits: CpuLimits) -> LimitCpuRequest {
    LimitCpuRequest {
        handle: handle.clone(),
        limit_in_shares: limits.limit_in_shares,
    }
}

pub const fn cpu_from_wire(res: &LimitCpuResponse) -> CpuLimits {
    CpuLimits {
        limit_in_shares: res.limit_in_shares,
    }
}

pub fn disk_request(handle: &Handle, limits: DiskLimits) -> LimitDiskRequest {
    LimitDiskRequest {
        handle: handle.clone(),
        block_soft: limits.block_soft,
        block_hard: limits.block_hard,
        inode_soft: limits.inode_soft,
        inode_hard: limits.inode_hard,
        byte_soft: limits.byte_soft,
        byte_hard: limits.byte_hard,
    }
}

pub const fn disk_from_wire(res: &LimitDiskResponse) -> DiskLimits {
    DiskLimits {
        block_soft: res.block_soft,
        block_hard: res.block_hard,
        inode_soft: res.inode_soft,
        inode_hard: res.inode_hard,
        byte_soft: res.byte_soft,
        byte_hard: res.byte_hard,
    }
}

pub fn memory_request(handle: &Handle, limits: MemoryLimits) -> LimitMemoryRequest {
    LimitMemoryRequest {
        handle: handle.clone(),
        limit_in_bytes: limits.limit_in_bytes,
    }
}

pub const fn memory_from_wire(res: &LimitMemoryResponse) -> MemoryLimits {
    MemoryLimits {
        limit_in_bytes: res.limit_in_bytes,
    }
}

pub fn run_request(handle: &Handle, spec: &ProcessSpec) -> RunRequest {
    RunRequest {
        handle: handle.clone(),
        path: spec.path.clone(),
        args: spec.args.clone(),
        env: spec
            .env
            .iter()
            .map(|(key, value)| EnvironmentVariable {
                key: key.clone(),
                value: value.clone(),
            })
            .collect(),
        dir: spec.dir.clone(),
        privileged: Some(spec.privileged),
        user: spec.user.clone(),
        rlimits: (spec.limits != ResourceLimits::default()).then_some(spec.limits),
        tty: spec.tty,
    }
}

pub fn net_out_request(handle: &Handle, rule: NetOutRule) -> NetOutRequest {
    NetOutRequest {
        handle: handle.clone(),
        protocol: rule.protocol,
        network: rule.network,
        ports: rule.ports,
        icmp: rule.icmp,
        log: rule.log,
    }
}

/// Maps a stream frame to a chunk. Frames with neither output nor an exit
/// status carry nothing for the consumer and yield `None`.
pub fn chunk_from_payload(payload: ProcessPayload) -> Option<ProcessChunk> {
    if let Some(status) = payload.exit_status {
        return Some(ProcessChunk::Exit { status });
    }
    if payload.source.is_none() && payload.data.is_none() {
        return None;
    }
    Some(ProcessChunk::Output {
        source: payload.source.unwrap_or(StreamSource::Stdout),
        data: payload.data.unwrap_or_default(),
    })
}
