//! Default sender backed by reqwest.

use std::{sync::LazyLock, time::Duration};

use ::http::{Request, Response};
use reqwest::{Client, redirect};
use tracing::instrument;

use super::{HttpSend, clone_request, config::HttpConfig};
use crate::error::{GatewayError, Result};

/// Shared default client so default senders share one connection pool.
#[allow(clippy::expect_used, reason = "a client with static settings always builds")]
static DEFAULT_HTTP_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .pool_max_idle_per_host(32)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create default HTTP client")
});

/// Sends requests with a [`reqwest::Client`].
///
/// Redirects are not followed: a 3xx response is handed back to the caller.
/// Every hop toward another host therefore goes back through
/// [`CredentialTransport`](super::CredentialTransport) and its host check.
///
/// # Examples
///
/// ```
/// use fatzebra::transport::{HttpConfig, ReqwestSender};
///
/// let default_sender = ReqwestSender::default();
///
/// let config = HttpConfig { timeout_secs: 60, ..HttpConfig::default() };
/// let tuned = ReqwestSender::with_config(&config).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: Client,
}

impl Default for ReqwestSender {
    /// Uses the shared default client (30s timeout, 10s connect timeout).
    fn default() -> Self {
        Self { client: DEFAULT_HTTP_CLIENT.clone() }
    }
}

impl ReqwestSender {
    /// Creates a sender with its own client built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the config is out of bounds,
    /// or [`GatewayError::Http`] if the client cannot be built.
    pub fn with_config(config: &HttpConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .redirect(redirect::Policy::none());

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder.build().map_err(GatewayError::Http)?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    ///
    /// The client's own redirect policy applies.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl HttpSend for ReqwestSender {
    #[instrument(skip_all, fields(method = %request.method(), uri = %request.uri()))]
    async fn send(&self, request: &Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        let outbound = reqwest::Request::try_from(clone_request(request))?;
        let response = self.client.execute(outbound).await?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        let mut converted = Response::new(body);
        *converted.status_mut() = status;
        *converted.version_mut() = version;
        *converted.headers_mut() = headers;
        Ok(converted)
    }
}
