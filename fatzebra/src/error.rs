//! Error types for the Fat Zebra client.
//!
//! Every fallible operation in this crate returns [`GatewayError`] through the
//! [`Result`] alias. Errors are never swallowed or downgraded by the library:
//! each one reaches the immediate caller.
//!
//! # Error Categories
//!
//! - **Configuration** ([`GatewayError::Configuration`]): the client could not
//!   be built. Fatal; fix the configuration.
//! - **Local rejection** ([`GatewayError::ExceedsMaximum`]): the amount is above
//!   the configured ceiling. No request was sent.
//! - **Gateway outcomes** ([`GatewayError::Transport`], [`GatewayError::NotFound`],
//!   [`GatewayError::ConflictingResults`], [`GatewayError::Validation`]): the
//!   gateway answered, but not with the record asked for.
//! - **Authentication** ([`GatewayError::BadSignature`]): an inbound tokenize
//!   result failed verification. A security event, never retried.
//! - **Network** ([`GatewayError::Http`], [`GatewayError::Timeout`],
//!   [`GatewayError::Cancelled`]): the call did not complete.
//!
//! # Examples
//!
//! ```
//! use fatzebra::error::GatewayError;
//!
//! let err = GatewayError::Transport { status: 502 };
//! assert_eq!(err.to_string(), "gateway returned HTTP status 502");
//! assert!(!err.is_transient());
//! ```

use thiserror::Error;

use crate::money::Amount;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur while talking to the gateway.
///
/// # Retrying
///
/// The library never retries. Only [`is_transient`](Self::is_transient) errors
/// are candidates for a caller-driven retry, and only when the caller reuses
/// the same purchase reference so the gateway can deduplicate.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The client configuration is unusable.
    ///
    /// Returned at construction time, e.g. for a non-positive maximum amount.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The purchase amount is above the client's ceiling.
    ///
    /// Raised before any request is built, so nothing reached the gateway.
    #[error("transaction amount {amount} exceeds maximum allowable {maximum}")]
    ExceedsMaximum {
        /// Amount that was requested.
        amount: Amount,
        /// Configured ceiling.
        maximum: Amount,
    },

    /// The gateway answered with an unexpected HTTP status.
    #[error("gateway returned HTTP status {status}")]
    Transport {
        /// HTTP status code.
        status: u16,
    },

    /// The requested record does not exist (HTTP 404 or an empty result set).
    #[error("record not found")]
    NotFound,

    /// More than one record matched a key that should be unique.
    ///
    /// This signals a data integrity problem on the gateway side and should
    /// never happen for a purchase reference.
    #[error("{count} records matched a unique key")]
    ConflictingResults {
        /// Number of records returned.
        count: usize,
    },

    /// The gateway rejected the request.
    ///
    /// Failed validations are not stored by the gateway, so a purchase that
    /// ends here cannot be looked up later by its reference.
    #[error("gateway rejected the request: {}", errors.first().map_or("no details", String::as_str))]
    Validation {
        /// Reference of the rejected purchase, when there was one.
        reference: Option<String>,
        /// Error messages reported by the gateway, in order.
        errors: Vec<String>,
        /// HTTP status code of the response.
        status: u16,
    },

    /// An inbound tokenize result failed signature verification.
    ///
    /// None of the message's fields may be trusted.
    #[error("bad signature on tokenize result")]
    BadSignature,

    /// The HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The call context was cancelled.
    #[error("call cancelled")]
    Cancelled,

    /// The call exceeded the context timeout.
    #[error("call timed out")]
    Timeout,

    /// A gateway response body was not valid JSON of the expected shape.
    #[error("failed to decode JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// Caller-supplied input could not be used.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The gateway answered successfully but the body was not usable.
    #[error("unexpected gateway response: {0}")]
    UnexpectedResponse(String),
}

impl GatewayError {
    /// Returns `true` for connection-level failures that a caller may retry.
    ///
    /// Gateway decisions (validation, not found, bad signature) are never transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(err) => err.is_connect() || err.is_timeout(),
            Self::Timeout => true,
            _ => false,
        }
    }

    /// Returns the HTTP status attached to this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status } | Self::Validation { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
