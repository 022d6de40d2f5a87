//! Gateway client.

use ::http::{
    Method, Request, Response, StatusCode, Uri,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::{
    config::{Credentials, GatewayConfig, canonical_host},
    context::CallContext,
    envelope::{Envelope, OneOrMany},
    error::{GatewayError, Result},
    money::Amount,
    purchase::{Purchase, PurchaseRequest},
    signing::MessageSigner,
    tokenize::{TokenizeResult, TokenizedCard, UnverifiedTokenizeResult},
    transport::{CredentialTransport, HttpSend, ReqwestSender},
};

const JSON: &str = "application/json";

/// Client for the Fat Zebra gateway.
///
/// The client is immutable after construction and may be shared between tasks
/// (wrap it in an `Arc`). Each call is independent: there is no client-side
/// transaction state, and nothing is retried.
///
/// # Examples
///
/// ```rust,no_run
/// use fatzebra::{
///     Amount, CallContext, Credentials, Environment, GatewayClient, GatewayConfig,
///     PurchaseRequest, generate_reference,
/// };
///
/// # async fn example() -> fatzebra::Result<()> {
/// let config = GatewayConfig::new(Environment::Sandbox, Amount::from_dollars(1500.0));
/// let credentials = Credentials::from_env(&config.auth)?;
/// let client = GatewayClient::with_default_sender(&config, credentials)?;
///
/// let request = PurchaseRequest::new(
///     "card-token",
///     Amount::from_dollars(10.0),
///     generate_reference("SHOP-"),
///     "203.0.113.7",
/// );
/// let purchase = client.do_purchase(&CallContext::new(), &request).await?;
/// println!("{} {}", purchase.id, purchase.message);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GatewayClient<S = ReqwestSender> {
    transport: CredentialTransport<S>,
    signer: MessageSigner,
    host: String,
    api_prefix: String,
    max_amount: Amount,
}

impl GatewayClient<ReqwestSender> {
    /// Creates a client over a [`ReqwestSender`] built from `config.http`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if `config` does not validate.
    pub fn with_default_sender(config: &GatewayConfig, credentials: Credentials) -> Result<Self> {
        config.validate()?;
        let sender = ReqwestSender::with_config(&config.http)?;
        Self::new(config, credentials, sender)
    }
}

impl<S: HttpSend> GatewayClient<S> {
    /// Creates a client that sends through `sender`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if `config` does not validate,
    /// in particular when the maximum amount is not positive.
    pub fn new(config: &GatewayConfig, credentials: Credentials, sender: S) -> Result<Self> {
        config.validate()?;

        let host = canonical_host(config.gateway_host())?;
        let Credentials { username, password, secret } = credentials;

        info!(host = %host, max_amount = %config.max_amount(), "gateway client created");

        Ok(Self {
            transport: CredentialTransport::with_sender(host.clone(), username, password, sender),
            signer: MessageSigner::new(secret),
            host,
            api_prefix: config.api_prefix.clone(),
            max_amount: config.max_amount(),
        })
    }

    /// Returns the gateway host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the purchase ceiling.
    #[must_use]
    pub fn max_amount(&self) -> Amount {
        self.max_amount
    }

    /// Charges a tokenized card.
    ///
    /// A declined card is not an error: the returned [`Purchase`] has
    /// `successful == false`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::ExceedsMaximum`] if the amount is above the ceiling.
    ///   Nothing is sent.
    /// - [`GatewayError::Transport`] for any status other than 200.
    /// - [`GatewayError::Validation`] if the gateway refused the request.
    ///   Refused purchases are not recorded and cannot be looked up.
    /// - [`GatewayError::Cancelled`] or [`GatewayError::Timeout`] from `ctx`.
    /// - [`GatewayError::Http`] or [`GatewayError::Decode`] on transport failure.
    #[instrument(
        skip(self, ctx, request),
        fields(reference = %request.reference, amount = %request.amount)
    )]
    pub async fn do_purchase(&self, ctx: &CallContext, request: &PurchaseRequest) -> Result<Purchase> {
        if request.amount > self.max_amount {
            warn!(maximum = %self.max_amount, "purchase above maximum amount, not sent");
            return Err(GatewayError::ExceedsMaximum {
                amount: request.amount,
                maximum: self.max_amount,
            });
        }

        let body = serde_json::to_vec(request)?;
        let http_request = build_request(Method::POST, self.endpoint(&["purchases"], None)?, body)?;
        let response = self.execute(ctx, &http_request).await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GatewayError::Transport { status: status.as_u16() });
        }

        let envelope: Envelope<Purchase> = decode(&response)?;
        let purchase = envelope
            .into_payload(status.as_u16(), Some(&request.reference))?
            .ok_or_else(|| {
                GatewayError::UnexpectedResponse("successful purchase without a record".to_owned())
            })?;

        info!(id = %purchase.id, successful = purchase.successful, "purchase processed");
        Ok(purchase)
    }

    /// Looks up a purchase by its merchant reference.
    ///
    /// Use this to find out what happened to a purchase whose response was
    /// lost, e.g. after a timeout.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::NotFound`] on HTTP 404 or when no purchase matches.
    /// - [`GatewayError::ConflictingResults`] when several purchases match.
    /// - [`GatewayError::Transport`] for any other status than 200.
    /// - [`GatewayError::Validation`] if the gateway refused the request.
    /// - [`GatewayError::InvalidInput`] if `reference` is empty.
    #[instrument(skip(self, ctx))]
    pub async fn purchase_by_reference(&self, ctx: &CallContext, reference: &str) -> Result<Purchase> {
        if reference.is_empty() {
            return Err(GatewayError::InvalidInput("reference is empty".to_owned()));
        }

        let uri = self.endpoint(&["purchases"], Some(("reference", reference)))?;
        let response = self.execute(ctx, &build_request(Method::GET, uri, Vec::new())?).await?;
        let status = checked_status(&response)?;

        let envelope: Envelope<OneOrMany<Purchase>> = decode(&response)?;
        let records = envelope
            .into_payload(status, Some(reference))?
            .map(OneOrMany::into_vec)
            .unwrap_or_default();

        match <[Purchase; 1]>::try_from(records) {
            Ok([purchase]) => Ok(purchase),
            Err(records) if records.is_empty() => Err(GatewayError::NotFound),
            Err(records) => {
                error!(count = records.len(), "several purchases share one reference");
                Err(GatewayError::ConflictingResults { count: records.len() })
            }
        }
    }

    /// Fetches a stored card by token.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::NotFound`] on HTTP 404.
    /// - [`GatewayError::Transport`] for any other status than 200.
    /// - [`GatewayError::Validation`] if the gateway refused the request.
    /// - [`GatewayError::InvalidInput`] if `token` is empty.
    #[instrument(skip_all)]
    pub async fn tokenized_card(&self, ctx: &CallContext, token: &str) -> Result<TokenizedCard> {
        if token.is_empty() {
            return Err(GatewayError::InvalidInput("card token is empty".to_owned()));
        }

        let uri = self.endpoint(&["credit_cards", token], None)?;
        let response = self.execute(ctx, &build_request(Method::GET, uri, Vec::new())?).await?;
        let status = checked_status(&response)?;

        let envelope: Envelope<TokenizedCard> = decode(&response)?;
        envelope.into_payload(status, None)?.ok_or_else(|| {
            GatewayError::UnexpectedResponse("successful card lookup without a record".to_owned())
        })
    }

    /// Reads and verifies a direct tokenization result delivered to the
    /// merchant, as a JSON `POST` or as redirect query parameters.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidInput`] if the message is malformed.
    /// - [`GatewayError::BadSignature`] if verification fails. None of the
    ///   message's content may be used in that case.
    #[instrument(skip_all, fields(method = %request.method()))]
    pub fn parse_direct_tokenize_result<B: AsRef<[u8]>>(
        &self,
        request: &Request<B>,
    ) -> Result<TokenizeResult> {
        UnverifiedTokenizeResult::from_request(request)?.verify(&self.signer)
    }

    /// Verifies a tokenize result that was read by other means.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BadSignature`] if verification fails.
    pub fn verify_tokenize_result(&self, result: UnverifiedTokenizeResult) -> Result<TokenizeResult> {
        result.verify(&self.signer)
    }

    /// Signs a redirect URL for the direct tokenization form.
    ///
    /// The gateway only redirects to a URL accompanied by this hash.
    #[must_use]
    pub fn tokenize_hash(&self, redirect_url: &str) -> String {
        self.signer.sign(redirect_url.as_bytes())
    }

    fn endpoint(&self, segments: &[&str], query: Option<(&str, &str)>) -> Result<Uri> {
        let mut url = Url::parse(&format!("https://{}", self.host))
            .map_err(|e| GatewayError::Configuration(format!("invalid gateway host: {e}")))?;

        url.path_segments_mut()
            .map_err(|()| GatewayError::Configuration("gateway host cannot be a base".to_owned()))?
            .clear()
            .extend(self.api_prefix.split('/').filter(|s| !s.is_empty()))
            .extend(segments);

        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, value);
        }

        url.as_str()
            .parse()
            .map_err(|e| GatewayError::InvalidInput(format!("invalid request URI: {e}")))
    }

    async fn execute(&self, ctx: &CallContext, request: &Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        ctx.run(self.transport.send(request)).await
    }
}

fn build_request(method: Method, uri: Uri, body: Vec<u8>) -> Result<Request<Vec<u8>>> {
    let mut builder = Request::builder().method(method).uri(uri).header(ACCEPT, JSON);
    if !body.is_empty() {
        builder = builder.header(CONTENT_TYPE, JSON);
    }
    builder
        .body(body)
        .map_err(|e| GatewayError::InvalidInput(format!("invalid request: {e}")))
}

/// Maps 404 to [`GatewayError::NotFound`] and any other non-200 status to
/// [`GatewayError::Transport`].
fn checked_status(response: &Response<Vec<u8>>) -> Result<u16> {
    match response.status() {
        StatusCode::OK => Ok(StatusCode::OK.as_u16()),
        StatusCode::NOT_FOUND => Err(GatewayError::NotFound),
        status => Err(GatewayError::Transport { status: status.as_u16() }),
    }
}

fn decode<T: DeserializeOwned>(response: &Response<Vec<u8>>) -> Result<Envelope<T>> {
    Ok(serde_json::from_slice(response.body())?)
}
