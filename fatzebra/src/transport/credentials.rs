//! Credential-injecting transport.

use ::http::{
    HeaderValue, Request, Response, Uri,
    header::AUTHORIZATION,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use super::{HttpSend, ReqwestSender, clone_request};
use crate::error::{GatewayError, Result};

/// Decorates an [`HttpSend`] with gateway Basic-Auth credentials.
///
/// For each request, the destination is compared with the configured gateway
/// host:
///
/// - **Match** (HTTPS, same host and port): a copy of the request is sent with
///   an `Authorization: Basic ...` header. The caller's request is left as is.
/// - **No match** (any other host, e.g. a third-party redirect target): the
///   request is forwarded unmodified. Credentials never leave for another host.
///
/// The host comparison is exact apart from ASCII case. `gateway.example.com`
/// does not match `evil-gateway.example.com`, `gateway.example.com.evil.net`
/// or `gateway.example.com:8443`.
///
/// # Examples
///
/// ```
/// use fatzebra::transport::CredentialTransport;
///
/// let transport = CredentialTransport::new("gateway.example.com", "user", "pass".to_owned().into());
///
/// assert!(transport.targets_gateway(&"https://gateway.example.com/v1.0/purchases".parse().unwrap()));
/// assert!(!transport.targets_gateway(&"https://cdn.example.net/".parse().unwrap()));
/// ```
#[derive(Debug)]
pub struct CredentialTransport<S = ReqwestSender> {
    host: String,
    username: String,
    password: SecretString,
    inner: S,
}

impl CredentialTransport<ReqwestSender> {
    /// Creates a transport over the default [`ReqwestSender`].
    #[must_use]
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: SecretString) -> Self {
        Self::with_sender(host, username, password, ReqwestSender::default())
    }
}

impl<S> CredentialTransport<S> {
    /// Creates a transport over `inner`.
    #[must_use]
    pub fn with_sender(
        host: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
        inner: S,
    ) -> Self {
        Self { host: host.into(), username: username.into(), password, inner }
    }

    /// Returns the gateway host credentials are sent to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the wrapped sender.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns `true` if a request to `uri` should carry credentials.
    #[must_use]
    pub fn targets_gateway(&self, uri: &Uri) -> bool {
        if uri.scheme_str() != Some("https") {
            return false;
        }

        uri.authority().is_some_and(|authority| {
            // Userinfo is never part of the host we compare against.
            let host_port = authority.as_str().rsplit('@').next().unwrap_or_default();
            host_port.eq_ignore_ascii_case(&self.host)
        })
    }

    fn basic_auth(&self) -> Result<HeaderValue> {
        let credentials = format!("{}:{}", self.username, self.password.expose_secret());
        let mut value = HeaderValue::try_from(format!("Basic {}", STANDARD.encode(credentials)))
            .map_err(|e| GatewayError::Configuration(format!("invalid credentials: {e}")))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl<S: HttpSend> HttpSend for CredentialTransport<S> {
    #[instrument(
        skip_all,
        fields(method = %request.method(), host = request.uri().host().unwrap_or_default())
    )]
    async fn send(&self, request: &Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        if !self.targets_gateway(request.uri()) {
            debug!("destination is not the gateway, forwarding without credentials");
            return self.inner.send(request).await;
        }

        let mut authenticated = clone_request(request);
        authenticated.headers_mut().insert(AUTHORIZATION, self.basic_auth()?);
        self.inner.send(&authenticated).await
    }
}
