//! A handle bound to a connection.

use bytes::Bytes;
use enclave_common::limits::{BandwidthLimits, CpuLimits, DiskLimits, MemoryLimits};
use enclave_common::net::NetOutRule;
use enclave_common::process::{ProcessSpec, Signal, TtySpec};
use enclave_common::types::{ContainerInfo, Handle};
use tokio_util::sync::CancellationToken;

use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::stream::{ByteStream, ProcessStream};

/// One container, addressed through a [`Connection`].
///
/// Every method forwards to the connection method of the same name.
#[derive(Debug, Clone)]
pub struct Container {
    connection: Connection,
    handle: Handle,
}

impl Container {
    pub(crate) const fn new(connection: Connection, handle: Handle) -> Self {
        Self { connection, handle }
    }

    /// Handle of the container.
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Connection the container is addressed through.
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Destroys the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn destroy(&self) -> Result<()> {
        self.connection.destroy(&self.handle).await
    }

    /// Stops every process in the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn stop(&self, background: bool, kill: bool) -> Result<()> {
        self.connection.stop(&self.handle, background, kill).await
    }

    /// Returns a snapshot of the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn info(&self) -> Result<ContainerInfo> {
        self.connection.info(&self.handle).await
    }

    /// Looks up one property of the container.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PropertyNotFound`] if the container does not
    /// carry `name`, or any error of [`info`](Self::info).
    pub async fn property(&self, name: &str) -> Result<String> {
        let mut info = self.info().await?;
        info.properties
            .remove(name)
            .ok_or_else(|| ClientError::PropertyNotFound {
                name: name.to_string(),
            })
    }

    /// Uploads raw bytes into the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn stream_in(&self, destination: &str, data: impl Into<Bytes>) -> Result<()> {
        self.connection
            .stream_in(&self.handle, destination, data)
            .await
    }

    /// Downloads raw bytes from the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn stream_out(&self, source: &str) -> Result<ByteStream> {
        self.connection.stream_out(&self.handle, source).await
    }

    /// Sets bandwidth limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn limit_bandwidth(&self, limits: BandwidthLimits) -> Result<BandwidthLimits> {
        self.connection.limit_bandwidth(&self.handle, limits).await
    }

    /// Returns the current bandwidth limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn current_bandwidth_limits(&self) -> Result<BandwidthLimits> {
        self.connection.current_bandwidth_limits(&self.handle).await
    }

    /// Sets CPU limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn limit_cpu(&self, limits: CpuLimits) -> Result<CpuLimits> {
        self.connection.limit_cpu(&self.handle, limits).await
    }

    /// Returns the current CPU limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn current_cpu_limits(&self) -> Result<CpuLimits> {
        self.connection.current_cpu_limits(&self.handle).await
    }

    /// Sets disk limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn limit_disk(&self, limits: DiskLimits) -> Result<DiskLimits> {
        self.connection.limit_disk(&self.handle, limits).await
    }

    /// Returns the current disk limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn current_disk_limits(&self) -> Result<DiskLimits> {
        self.connection.current_disk_limits(&self.handle).await
    }

    /// Sets memory limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn limit_memory(&self, limits: MemoryLimits) -> Result<MemoryLimits> {
        self.connection.limit_memory(&self.handle, limits).await
    }

    /// Returns the current memory limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn current_memory_limits(&self) -> Result<MemoryLimits> {
        self.connection.current_memory_limits(&self.handle).await
    }

    /// Starts a process in the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the process could not be started.
    pub async fn run(&self, spec: &ProcessSpec) -> Result<ProcessStream> {
        self.connection.run(&self.handle, spec).await
    }

    /// Starts a process in the container under an external cancellation token.
    ///
    /// # Errors
    ///
    /// Returns an error if the process could not be started.
    pub async fn run_with_cancel(
        &self,
        spec: &ProcessSpec,
        cancel: &CancellationToken,
    ) -> Result<ProcessStream> {
        self.connection
            .run_with_cancel(&self.handle, spec, cancel)
            .await
    }

    /// Attaches to a running process.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent.
    pub async fn attach(&self, process_id: u32) -> Result<ProcessStream> {
        self.connection.attach(&self.handle, process_id).await
    }

    /// Attaches to a running process under an external cancellation token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent.
    pub async fn attach_with_cancel(
        &self,
        process_id: u32,
        cancel: &CancellationToken,
    ) -> Result<ProcessStream> {
        self.connection
            .attach_with_cancel(&self.handle, process_id, cancel)
            .await
    }

    /// Delivers a signal to a process in the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn signal(&self, process_id: u32, signal: Signal) -> Result<()> {
        self.connection
            .signal(&self.handle, process_id, signal)
            .await
    }

    /// Changes the TTY of a process in the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn set_tty(&self, process_id: u32, tty: TtySpec) -> Result<()> {
        self.connection.set_tty(&self.handle, process_id, tty).await
    }

    /// Forwards a host port to a container port.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn net_in(
        &self,
        host_port: Option<u32>,
        container_port: Option<u32>,
    ) -> Result<(u32, u32)> {
        self.connection
            .net_in(&self.handle, host_port, container_port)
            .await
    }

    /// Whitelists outbound traffic.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn net_out(&self, rule: impl Into<NetOutRule>) -> Result<()> {
        self.connection.net_out(&self.handle, rule).await
    }
}
