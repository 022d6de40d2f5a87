//! HTTP transport layer.
//!
//! Requests travel through two layers:
//!
//! - [`HttpSend`]: the capability of sending one `http::Request` and returning
//!   one `http::Response`. [`ReqwestSender`] is the default; callers may plug in
//!   their own.
//! - [`CredentialTransport`]: a decorator over any [`HttpSend`] that attaches
//!   Basic-Auth credentials to requests for the configured gateway host, and
//!   only that host.
//!
//! Neither layer adds caching or retries.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fatzebra::transport::{CredentialTransport, HttpSend};
//!
//! # async fn example() -> fatzebra::Result<()> {
//! let transport = CredentialTransport::new(
//!     "gateway.sandbox.fatzebra.com.au",
//!     "TEST",
//!     "TEST".to_owned().into(),
//! );
//!
//! let request = http::Request::get("https://gateway.sandbox.fatzebra.com.au/v1.0/credit_cards/abc")
//!     .body(Vec::new())
//!     .map_err(|e| fatzebra::GatewayError::InvalidInput(e.to_string()))?;
//!
//! let response = transport.send(&request).await?;
//! println!("Status: {}", response.status());
//! # Ok(())
//! # }
//! ```

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;
use std::sync::Arc;

use ::http::{Request, Response};

use crate::error::Result;

pub mod config;
pub mod credentials;
pub mod http;

pub use self::{config::HttpConfig, credentials::CredentialTransport, http::ReqwestSender};

/// Sends a single HTTP request.
///
/// Implementations must not modify the request they are given; it is borrowed
/// immutably, so a decorator that needs to change it works on a copy
/// (see [`clone_request`]).
///
/// Implementations must be safe to call concurrently from many tasks.
pub trait HttpSend: Send + Sync {
    /// Sends `request` and returns the full response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent or the response could
    /// not be read. Non-2xx statuses are not errors at this layer.
    fn send<'a>(
        &'a self,
        request: &'a Request<Vec<u8>>,
    ) -> impl Future<Output = Result<Response<Vec<u8>>>> + Send + 'a;
}

impl<S: HttpSend> HttpSend for Arc<S> {
    fn send<'a>(
        &'a self,
        request: &'a Request<Vec<u8>>,
    ) -> impl Future<Output = Result<Response<Vec<u8>>>> + Send + 'a {
        S::send(self, request)
    }
}

/// Copies a request: method, URI, version, headers and body.
///
/// The header map is cloned, not shared, so changes to the copy never show up
/// in the original. Extensions are not copied.
#[must_use]
pub fn clone_request(request: &Request<Vec<u8>>) -> Request<Vec<u8>> {
    let mut copy = Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}
