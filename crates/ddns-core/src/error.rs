//! Error types for the DDNS system
//!
//! This module defines all error types used throughout the crate.
//!
//! ## Severity
//!
//! The same error can be fatal or recoverable depending on where it occurs.
//! During startup (zone and record resolution, auto-create) every error ends
//! the process. In the steady-state loop every error is logged and the cycle
//! is skipped; nothing escapes the loop boundary.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Every attempt of a request failed at the transport level
    /// (connection refused, DNS failure, timeout).
    #[error("{operation} failed after {attempts} attempt(s): {last_error}")]
    TransportExhausted {
        /// Short description of the request (e.g. "GET /zones")
        operation: String,
        /// Number of attempts made
        attempts: u32,
        /// Message of the last transport error
        last_error: String,
    },

    /// The provider returned no zone for the registrable domain
    #[error("Zone not found for domain: {0}")]
    ZoneNotFound(String),

    /// The public IP could not be determined or was not a valid address
    #[error("Public IP resolution failed: {0}")]
    IpResolution(String),

    /// Creating the DNS record failed
    #[error("Failed to create DNS record: {0}")]
    RecordCreate(String),

    /// Updating the DNS record failed
    #[error("Failed to update DNS record: {0}")]
    RecordUpdate(String),

    /// The provider answered, but the body could not be decoded
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The provider answered a lookup with a non-success status
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Provider error text
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors that are not transport failures
    /// (e.g. the client could not be built)
    #[error("HTTP error: {0}")]
    Http(String),
}

impl Error {
    /// Create a transport-exhausted error
    pub fn transport_exhausted(
        operation: impl Into<String>,
        attempts: u32,
        last_error: impl Into<String>,
    ) -> Self {
        Self::TransportExhausted {
            operation: operation.into(),
            attempts,
            last_error: last_error.into(),
        }
    }

    /// Create a zone-not-found error
    pub fn zone_not_found(domain: impl Into<String>) -> Self {
        Self::ZoneNotFound(domain.into())
    }

    /// Create an IP resolution error
    pub fn ip_resolution(msg: impl Into<String>) -> Self {
        Self::IpResolution(msg.into())
    }

    /// Create a record-create error
    pub fn record_create(msg: impl Into<String>) -> Self {
        Self::RecordCreate(msg.into())
    }

    /// Create a record-update error
    pub fn record_update(msg: impl Into<String>) -> Self {
        Self::RecordUpdate(msg.into())
    }

    /// Create a malformed-response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create an API status error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Whether every attempt of the underlying request failed
    pub fn is_transport_exhausted(&self) -> bool {
        matches!(self, Self::TransportExhausted { .. })
    }
}
