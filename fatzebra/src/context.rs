//! Per-call cancellation and timeout.

use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::error::{GatewayError, Result};

/// Caller-supplied controls for a single gateway call.
///
/// A context that is already cancelled short-circuits before the request is
/// issued. Cancellation or timeout while the request is in flight drops the
/// request future and returns [`GatewayError::Cancelled`] or
/// [`GatewayError::Timeout`].
///
/// Dropping the call future also cancels it, as with any future; the context is
/// for cancelling from somewhere else, e.g. on shutdown.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use fatzebra::CallContext;
/// use tokio_util::sync::CancellationToken;
///
/// let shutdown = CancellationToken::new();
/// let ctx = CallContext::new()
///     .with_cancellation(shutdown.child_token())
///     .with_timeout(Duration::from_secs(10));
///
/// assert!(!ctx.is_cancelled());
/// shutdown.cancel();
/// assert!(ctx.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancellation: Option<CancellationToken>,
    timeout: Option<Duration>,
}

impl CallContext {
    /// Creates a context with no cancellation and no timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Bounds the call to `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns `true` if the attached token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Returns the timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Runs `call` under this context.
    ///
    /// `call` is not polled at all when the context is already cancelled.
    pub(crate) async fn run<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        if self.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let bounded = async {
            match self.timeout {
                Some(limit) => {
                    tokio::time::timeout(limit, call).await.map_err(|_| GatewayError::Timeout)?
                }
                None => call.await,
            }
        };

        match &self.cancellation {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(GatewayError::Cancelled),
                result = bounded => result,
            },
            None => bounded.await,
        }
    }
}
