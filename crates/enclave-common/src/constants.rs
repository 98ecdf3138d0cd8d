//! System-wide constants and default values.

/// Size in bytes of one quota block, the native allocation unit of the
/// host quota subsystem.
pub const QUOTA_BLOCK_SIZE: u64 = 1024;

/// Default control endpoint address (`host:port`).
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:7777";

/// Default connect timeout for the control endpoint, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1000;

/// Default directory holding container depots on the host.
pub const DEFAULT_DEPOT_PATH: &str = "/var/lib/enclave/containers";

/// Default root directory of the host-side tooling (`<root>/bin/repquota`).
pub const DEFAULT_ROOT_PATH: &str = "/var/lib/enclave/root";

/// Content type of every framed request and response body.
pub const WIRE_CONTENT_TYPE: &str = "application/octet-stream";
