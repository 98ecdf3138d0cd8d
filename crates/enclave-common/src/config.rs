//! Configuration models for the control client and the quota backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{EnclaveError, Result};

/// Connection settings for the control protocol client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Control endpoint address as `host:port`.
    pub address: String,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl ClientConfig {
    /// Creates a configuration pointing at the given address with default timeouts.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Returns the connect timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the `http://` base URL for the endpoint.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: constants::DEFAULT_ADDRESS.to_string(),
            connect_timeout_ms: constants::DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

/// Host paths used by the disk quota backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Directory whose backing filesystem carries the container quotas.
    pub depot_path: PathBuf,
    /// Root of the host tooling; `repquota` is run from `<root_path>/bin`.
    pub root_path: PathBuf,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            depot_path: PathBuf::from(constants::DEFAULT_DEPOT_PATH),
            root_path: PathBuf::from(constants::DEFAULT_ROOT_PATH),
        }
    }
}

/// Loads a JSON configuration file into any configuration model.
///
/// Fields missing from the file take their default values.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| EnclaveError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.address, "127.0.0.1:7777");
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(1));
        assert_eq!(cfg.base_url(), "http://127.0.0.1:7777");
    }

    #[test]
    fn load_partial_client_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("client.json");
        std::fs::write(&path, r#"{ "address": "10.0.0.5:9000" }"#).expect("write");

        let cfg: ClientConfig = load_config(&path).expect("load");
        assert_eq!(cfg.address, "10.0.0.5:9000");
        assert_eq!(cfg.connect_timeout_ms, 1000);
    }

    #[test]
    fn load_quota_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("quota.json");
        std::fs::write(
            &path,
            r#"{ "depot_path": "/srv/depot", "root_path": "/opt/enclave" }"#,
        )
        .expect("write");

        let cfg: QuotaConfig = load_config(&path).expect("load");
        assert_eq!(cfg.depot_path, PathBuf::from("/srv/depot"));
        assert_eq!(cfg.root_path, PathBuf::from("/opt/enclave"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_config::<ClientConfig>(Path::new("/nonexistent/enclave.json"))
            .expect_err("should fail");
        assert!(matches!(err, EnclaveError::Io { .. }));
    }

    #[test]
    fn load_malformed_file_is_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").expect("write");

        let err = load_config::<QuotaConfig>(&path).expect_err("should fail");
        assert!(matches!(err, EnclaveError::Serialization(_)));
    }
}
