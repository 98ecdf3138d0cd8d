//! Connection to the control endpoint.

use bytes::Bytes;
use enclave_common::config::ClientConfig;
use enclave_common::constants::WIRE_CONTENT_TYPE;
use enclave_common::error::EnclaveError;
use enclave_common::limits::{BandwidthLimits, CpuLimits, DiskLimits, MemoryLimits};
use enclave_common::net::NetOutRule;
use enclave_common::process::{ProcessSpec, Signal, TtySpec};
use enclave_common::types::{Capacity, ContainerInfo, ContainerSpec, Handle, Properties};
use enclave_protocol::messages::{
    AttachRequest, CapacityRequest, CapacityResponse, CreateResponse, DestroyRequest,
    DestroyResponse, InfoRequest, InfoResponse, LimitBandwidthResponse, LimitCpuResponse,
    LimitDiskResponse, LimitMemoryResponse, ListRequest, ListResponse, NetInRequest,
    NetInResponse, NetOutResponse, PingRequest, PingResponse, SetTtyRequest, SetTtyResponse,
    SignalRequest, SignalResponse, StopRequest, StopResponse, StreamInResponse,
    properties_to_wire,
};
use enclave_protocol::{decode_reply, encode_frame};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::container::Container;
use crate::convert;
use crate::error::{ClientError, Result};
use crate::stream::{ByteStream, PayloadReader, ProcessStream};

/// Client for the control endpoint.
///
/// Holds two HTTP clients: a pooled one for request/response calls and one
/// without idle connections for long-lived process streams, so a stream never
/// holds a connection that another call expects to reuse. Cloning is cheap
/// and clones share both pools.
#[derive(Debug, Clone)]
pub struct Connection {
    base_url: String,
    client: reqwest::Client,
    streaming: reqwest::Client,
}

impl Connection {
    /// Builds the HTTP clients for the configured endpoint. Nothing is sent
    /// until the first call.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Common`] if an HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(build_error)?;
        let streaming = reqwest::Client::builder()
            .no_proxy()
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(0)
            .build()
            .map_err(build_error)?;

        tracing::debug!(address = %config.address, "control connection configured");
        Ok(Self {
            base_url: config.base_url(),
            client,
            streaming,
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Binds a handle to this connection.
    #[must_use]
    pub fn container(&self, handle: impl Into<Handle>) -> Container {
        Container::new(self.clone(), handle.into())
    }

    /// Checks that the endpoint is alive.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be reached or rejects the call.
    pub async fn ping(&self) -> Result<()> {
        let PingResponse {} = self.post("/ping", &PingRequest {}).await?;
        Ok(())
    }

    /// Reports the host capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn capacity(&self) -> Result<Capacity> {
        let res: CapacityResponse = self.post("/capacity", &CapacityRequest {}).await?;
        Ok(convert::capacity_from_wire(res))
    }

    /// Creates a container and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the response carries no handle.
    pub async fn create(&self, spec: &ContainerSpec) -> Result<Handle> {
        let res: CreateResponse = self
            .post("/create", &convert::create_request(spec))
            .await?;
        let handle = res
            .handle
            .ok_or(ClientError::MissingField { field: "handle" })?;
        tracing::info!(handle = %handle, "container created");
        Ok(handle)
    }

    /// Destroys a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn destroy(&self, handle: &Handle) -> Result<()> {
        let DestroyResponse {} = self
            .post(
                "/destroy",
                &DestroyRequest {
                    handle: handle.clone(),
                },
            )
            .await?;
        tracing::info!(handle = %handle, "container destroyed");
        Ok(())
    }

    /// Stops every process in a container. With `background` the call returns
    /// before they have exited; with `kill` they receive SIGKILL.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn stop(&self, handle: &Handle, background: bool, kill: bool) -> Result<()> {
        let request = StopRequest {
            handle: handle.clone(),
            background: Some(background),
            kill: Some(kill),
        };
        let StopResponse {} = self.post("/stop", &request).await?;
        tracing::info!(handle = %handle, background, kill, "container stopped");
        Ok(())
    }

    /// Lists containers carrying every given property. An empty filter lists
    /// all containers.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn list(&self, properties: &Properties) -> Result<Vec<Handle>> {
        let request = ListRequest {
            properties: properties_to_wire(properties),
        };
        let res: ListResponse = self.post("/list", &request).await?;
        Ok(res.handles)
    }

    /// Returns a snapshot of a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn info(&self, handle: &Handle) -> Result<ContainerInfo> {
        let res: InfoResponse = self
            .post(
                "/info",
                &InfoRequest {
                    handle: handle.clone(),
                },
            )
            .await?;
        Ok(convert::info_from_wire(res))
    }

    /// Uploads raw bytes to `destination` inside a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn stream_in(
        &self,
        handle: &Handle,
        destination: &str,
        data: impl Into<Bytes>,
    ) -> Result<()> {
        const ROUTE: &str = "/stream_in";
        let url = self.url_with_params(ROUTE, &[
            ("handle", handle.as_str()),
            ("destination", destination),
        ])?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, WIRE_CONTENT_TYPE)
            .body(data.into())
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(ROUTE, e))?;
        let response = check_status(ROUTE, response)?;
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_reqwest(ROUTE, e))?;
        let StreamInResponse {} = decode_reply::<StreamInResponse>(&body)?.into_result()?;
        tracing::debug!(handle = %handle, destination, "stream in complete");
        Ok(())
    }

    /// Downloads raw bytes from `source` inside a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the endpoint answers with a
    /// non-success status.
    pub async fn stream_out(&self, handle: &Handle, source: &str) -> Result<ByteStream> {
        const ROUTE: &str = "/stream_out";
        let url =
            self.url_with_params(ROUTE, &[("handle", handle.as_str()), ("source", source)])?;
        let response = self
            .streaming
            .post(url)
            .header(CONTENT_TYPE, WIRE_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(ROUTE, e))?;
        Ok(ByteStream::new(ROUTE, check_status(ROUTE, response)?))
    }

    /// Sets bandwidth limits and returns the effective ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn limit_bandwidth(
        &self,
        handle: &Handle,
        limits: BandwidthLimits,
    ) -> Result<BandwidthLimits> {
        tracing::info!(handle = %handle, ?limits, "limiting bandwidth");
        self.bandwidth_limits(handle, limits).await
    }

    /// Returns the current bandwidth limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn current_bandwidth_limits(&self, handle: &Handle) -> Result<BandwidthLimits> {
        self.bandwidth_limits(handle, BandwidthLimits::default())
            .await
    }

    async fn bandwidth_limits(
        &self,
        handle: &Handle,
        limits: BandwidthLimits,
    ) -> Result<BandwidthLimits> {
        let res: LimitBandwidthResponse = self
            .post("/limit_bandwidth", &convert::bandwidth_request(handle, limits))
            .await?;
        Ok(convert::bandwidth_from_wire(&res))
    }

    /// Sets CPU limits and returns the effective ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn limit_cpu(&self, handle: &Handle, limits: CpuLimits) -> Result<CpuLimits> {
        tracing::info!(handle = %handle, ?limits, "limiting cpu");
        self.cpu_limits(handle, limits).await
    }

    /// Returns the current CPU limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn current_cpu_limits(&self, handle: &Handle) -> Result<CpuLimits> {
        self.cpu_limits(handle, CpuLimits::default()).await
    }

    async fn cpu_limits(&self, handle: &Handle, limits: CpuLimits) -> Result<CpuLimits> {
        let res: LimitCpuResponse = self
            .post("/limit_cpu", &convert::cpu_request(handle, limits))
            .await?;
        Ok(convert::cpu_from_wire(&res))
    }

    /// Sets disk limits and returns the effective ones. A non-zero byte limit
    /// replaces the matching block limit with its size in 1 KiB blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn limit_disk(&self, handle: &Handle, limits: DiskLimits) -> Result<DiskLimits> {
        let limits = limits.with_derived_blocks();
        tracing::info!(handle = %handle, ?limits, "limiting disk");
        self.disk_limits(handle, limits).await
    }

    /// Returns the current disk limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn current_disk_limits(&self, handle: &Handle) -> Result<DiskLimits> {
        self.disk_limits(handle, DiskLimits::default()).await
    }

    async fn disk_limits(&self, handle: &Handle, limits: DiskLimits) -> Result<DiskLimits> {
        let res: LimitDiskResponse = self
            .post("/limit_disk", &convert::disk_request(handle, limits))
            .await?;
        Ok(convert::disk_from_wire(&res))
    }

    /// Sets memory limits and returns the effective ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn limit_memory(
        &self,
        handle: &Handle,
        limits: MemoryLimits,
    ) -> Result<MemoryLimits> {
        tracing::info!(handle = %handle, ?limits, "limiting memory");
        self.memory_limits(handle, limits).await
    }

    /// Returns the current memory limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn current_memory_limits(&self, handle: &Handle) -> Result<MemoryLimits> {
        self.memory_limits(handle, MemoryLimits::default()).await
    }

    async fn memory_limits(&self, handle: &Handle, limits: MemoryLimits) -> Result<MemoryLimits> {
        let res: LimitMemoryResponse = self
            .post("/limit_memory", &convert::memory_request(handle, limits))
            .await?;
        Ok(convert::memory_from_wire(&res))
    }

    /// Starts a process and streams its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process could not be started. Failures after
    /// the start arrive as stream items.
    pub async fn run(&self, handle: &Handle, spec: &ProcessSpec) -> Result<ProcessStream> {
        self.run_with_cancel(handle, spec, &CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run); cancelling `cancel` ends the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the process could not be started.
    pub async fn run_with_cancel(
        &self,
        handle: &Handle,
        spec: &ProcessSpec,
        cancel: &CancellationToken,
    ) -> Result<ProcessStream> {
        const ROUTE: &str = "/run";
        let response = self
            .send(&self.streaming, ROUTE, &convert::run_request(handle, spec))
            .await?;
        let mut reader = PayloadReader::new(ROUTE, response);
        let first = reader
            .next_payload()
            .await?
            .ok_or(ClientError::Disconnected)?;
        let process_id = first
            .process_id
            .ok_or(ClientError::MissingField {
                field: "process_id",
            })?;
        tracing::info!(handle = %handle, process_id, path = %spec.path, "process started");
        Ok(ProcessStream::spawn(Some(process_id), reader, cancel))
    }

    /// Streams the remaining output of a running process.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent. An unknown process is
    /// reported as the first stream item.
    pub async fn attach(&self, handle: &Handle, process_id: u32) -> Result<ProcessStream> {
        self.attach_with_cancel(handle, process_id, &CancellationToken::new())
            .await
    }

    /// Like [`attach`](Self::attach); cancelling `cancel` ends the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent.
    pub async fn attach_with_cancel(
        &self,
        handle: &Handle,
        process_id: u32,
        cancel: &CancellationToken,
    ) -> Result<ProcessStream> {
        const ROUTE: &str = "/attach";
        let request = AttachRequest {
            handle: handle.clone(),
            process_id,
        };
        let response = self.send(&self.streaming, ROUTE, &request).await?;
        tracing::debug!(handle = %handle, process_id, "attached to process");
        Ok(ProcessStream::spawn(
            None,
            PayloadReader::new(ROUTE, response),
            cancel,
        ))
    }

    /// Delivers `signal` to a running process.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn signal(&self, handle: &Handle, process_id: u32, signal: Signal) -> Result<()> {
        let request = SignalRequest {
            handle: handle.clone(),
            process_id,
            signal,
        };
        let SignalResponse {} = self.post("/signal", &request).await?;
        tracing::info!(handle = %handle, process_id, %signal, "process signalled");
        Ok(())
    }

    /// Changes the TTY of a running process, typically to resize its window.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn set_tty(&self, handle: &Handle, process_id: u32, tty: TtySpec) -> Result<()> {
        let request = SetTtyRequest {
            handle: handle.clone(),
            process_id,
            tty,
        };
        let SetTtyResponse {} = self.post("/set_tty", &request).await?;
        tracing::debug!(handle = %handle, process_id, ?tty, "process tty updated");
        Ok(())
    }

    /// Forwards a host port to a container port and returns both.
    /// Either may be left unset for the endpoint to choose.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or a port is missing from the reply.
    pub async fn net_in(
        &self,
        handle: &Handle,
        host_port: Option<u32>,
        container_port: Option<u32>,
    ) -> Result<(u32, u32)> {
        let request = NetInRequest {
            handle: handle.clone(),
            host_port,
            container_port,
        };
        let res: NetInResponse = self.post("/net_in", &request).await?;
        let host_port = res.host_port.ok_or(ClientError::MissingField {
            field: "host_port",
        })?;
        let container_port = res.container_port.ok_or(ClientError::MissingField {
            field: "container_port",
        })?;
        tracing::info!(handle = %handle, host_port, container_port, "port mapped");
        Ok((host_port, container_port))
    }

    /// Whitelists outbound traffic matching `rule`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn net_out(&self, handle: &Handle, rule: impl Into<NetOutRule>) -> Result<()> {
        let rule = rule.into();
        let NetOutResponse {} = self
            .post("/net_out", &convert::net_out_request(handle, rule))
            .await?;
        tracing::info!(handle = %handle, protocol = ?rule.protocol, network = %rule.network, "outbound rule added");
        Ok(())
    }

    async fn post<Req, Res>(&self, route: &'static str, request: &Req) -> Result<Res>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        let response = self.send(&self.client, route, request).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_reqwest(route, e))?;
        Ok(decode_reply::<Res>(&body)?.into_result()?)
    }

    async fn send<Req>(
        &self,
        client: &reqwest::Client,
        route: &'static str,
        request: &Req,
    ) -> Result<reqwest::Response>
    where
        Req: Serialize + Sync,
    {
        let body = encode_frame(request)?;
        tracing::debug!(route, len = body.len(), "posting request");
        let response = client
            .post(format!("{}{route}", self.base_url))
            .header(CONTENT_TYPE, WIRE_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(route, e))?;
        check_status(route, response)
    }

    fn url_with_params(&self, route: &str, params: &[(&str, &str)]) -> Result<reqwest::Url> {
        reqwest::Url::parse_with_params(&format!("{}{route}", self.base_url), params).map_err(
            |e| {
                ClientError::Common(EnclaveError::Config {
                    message: format!("invalid endpoint url: {e}"),
                })
            },
        )
    }
}

fn check_status(route: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        tracing::debug!(route, %status, "endpoint returned an error status");
        Err(ClientError::Http {
            route: route.to_string(),
            status,
        })
    }
}

fn build_error(err: reqwest::Error) -> ClientError {
    ClientError::Common(EnclaveError::Config {
        message: format!("cannot build http client: {err}"),
    })
}
