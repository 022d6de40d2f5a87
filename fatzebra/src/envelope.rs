//! The JSON envelope wrapped around every gateway response.

use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::error::{GatewayError, Result};

/// Gateway response wrapper.
///
/// ```json
/// {
///   "successful": true,
///   "response": { ... },
///   "errors": [],
///   "test": true
/// }
/// ```
///
/// List endpoints add paging fields and return an array in `response`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Whether the gateway accepted the request.
    pub successful: bool,

    /// Payload. Absent on most failures.
    #[serde(default = "Option::default")]
    pub response: Option<T>,

    /// Human-readable error messages, in the order the gateway reported them.
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<String>,

    /// Whether the gateway processed the request in test mode.
    #[serde(default)]
    pub test: Option<bool>,

    /// Records on this page.
    #[serde(default)]
    pub records: Option<u64>,

    /// Records across all pages.
    #[serde(default)]
    pub total_records: Option<u64>,

    /// Current page, starting at 1.
    #[serde(default)]
    pub page: Option<u64>,

    /// Number of pages.
    #[serde(default)]
    pub total_pages: Option<u64>,
}

impl<T> Envelope<T> {
    /// Returns the payload of a successful envelope.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] carrying `errors`, `status` and
    /// `reference` when `successful` is false.
    pub fn into_payload(self, status: u16, reference: Option<&str>) -> Result<Option<T>> {
        if self.successful {
            return Ok(self.response);
        }

        warn!(status, errors = ?self.errors, reference, "gateway rejected the request");
        Err(GatewayError::Validation {
            reference: reference.map(str::to_owned),
            errors: self.errors,
            status,
        })
    }
}

/// Either a single object or an array of them.
///
/// Search endpoints return an array; some gateway versions return the single
/// match as a bare object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// An array of records.
    Many(Vec<T>),
    /// A single record.
    One(T),
}

impl<T> OneOrMany<T> {
    /// Flattens into a vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(records) => records,
            Self::One(record) => vec![record],
        }
    }
}

/// Reads `null` as the type's default. Missing fields still need `#[serde(default)]`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
