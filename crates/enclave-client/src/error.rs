//! Client error taxonomy.
//!
//! Transport failures (connect, HTTP status, malformed body) are kept apart
//! from domain errors the endpoint reports inside a well-formed reply.

use enclave_common::error::EnclaveError;
use enclave_protocol::{ErrorResponse, ProtocolError};
use thiserror::Error;

/// Error returned by every client operation.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The control endpoint could not be reached.
    #[error("cannot reach endpoint for {route}: {source}")]
    Connect {
        /// Route being requested.
        route: String,
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status.
    #[error("{route} returned {status}")]
    Http {
        /// Route being requested.
        route: String,
        /// Status code and reason text.
        status: reqwest::StatusCode,
    },

    /// Sending the request or reading the response body failed.
    #[error("transport error on {route}: {source}")]
    Transport {
        /// Route being requested.
        route: String,
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },

    /// The response body is not a well-formed reply.
    #[error("malformed response: {0}")]
    Protocol(#[from] ProtocolError),

    /// A well-formed reply lacks a field the operation needs.
    #[error("response is missing {field}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The endpoint rejected the request.
    #[error("{message}")]
    Domain {
        /// Error message from the endpoint.
        message: String,
        /// Extra context from the endpoint.
        data: Option<String>,
        /// Endpoint-side backtrace.
        backtrace: Vec<String>,
    },

    /// The container does not carry the requested property.
    #[error("property not found: {name}")]
    PropertyNotFound {
        /// Property name.
        name: String,
    },

    /// A process stream closed before delivering an exit status.
    #[error("process stream closed before the process exited")]
    Disconnected,

    /// Configuration or other shared failure.
    #[error(transparent)]
    Common(#[from] EnclaveError),
}

impl ClientError {
    /// Wraps a `reqwest` failure, telling connect failures apart.
    pub(crate) fn from_reqwest(route: &str, source: reqwest::Error) -> Self {
        if source.is_connect() {
            Self::Connect {
                route: route.to_string(),
                source,
            }
        } else {
            Self::Transport {
                route: route.to_string(),
                source,
            }
        }
    }

    /// Whether the call failed below the domain layer.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Http { .. } | Self::Transport { .. } | Self::Protocol(_)
        )
    }

    /// Whether the endpoint reported a domain error.
    #[must_use]
    pub const fn is_domain(&self) -> bool {
        matches!(self, Self::Domain { .. })
    }
}

impl From<ErrorResponse> for ClientError {
    fn from(error: ErrorResponse) -> Self {
        Self::Domain {
            message: error.message,
            data: error.data,
            backtrace: error.backtrace,
        }
    }
}

/// Convenience alias for client results.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_keeps_endpoint_details() {
        let err = ClientError::from(ErrorResponse {
            message: "unknown handle: c9".into(),
            data: Some("c9".into()),
            backtrace: vec!["server.rs:12".into()],
        });
        assert!(err.is_domain());
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "unknown handle: c9");
    }

    #[test]
    fn http_status_is_transport() {
        let err = ClientError::Http {
            route: "/ping".into(),
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "/ping returned 500 Internal Server Error");
    }
}
