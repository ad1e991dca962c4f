// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Registry client error type
#[derive(Error, Debug, Diagnostic)]
pub enum RegistryError {
    /// The registry endpoint could not be reached
    #[error("Registry unreachable: {message}")]
    #[diagnostic(
        code(registry::unreachable),
        help("Check the registry endpoints and network connectivity; the background monitor will keep retrying the connection")
    )]
    Unreachable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The registry answered with a non-success status
    #[error("Registry request failed with status {status}: {message}")]
    #[diagnostic(
        code(registry::gateway_status),
        help("Inspect the registry gateway logs for the failing request")
    )]
    GatewayStatus {
        status: u16,
        message: String,
    },

    /// A registry response could not be decoded
    #[error("Failed to decode registry response: {message}")]
    #[diagnostic(
        code(registry::decode_error),
        help("Ensure the endpoint speaks the etcd v3 JSON gateway protocol")
    )]
    DecodeError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Client construction failed
    #[error("Failed to build registry client: {message}")]
    #[diagnostic(
        code(registry::client_error),
        help("This is likely a TLS or configuration problem on this host")
    )]
    ClientError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

impl RegistryError {
    /// Create an Unreachable error
    pub fn unreachable(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Unreachable {
            message: message.into(),
            source,
        }
    }

    /// Create a GatewayStatus error
    pub fn gateway_status(status: u16, message: impl Into<String>) -> Self {
        Self::GatewayStatus {
            status,
            message: message.into(),
        }
    }

    /// Create a DecodeError
    pub fn decode_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::DecodeError {
            message: message.into(),
            source,
        }
    }

    /// Create a ClientError
    pub fn client_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ClientError {
            message: message.into(),
            source,
        }
    }
}
