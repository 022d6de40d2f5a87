//! Fat Zebra: Card-Payment Gateway Client
//!
//! A Rust client for the Fat Zebra card-payment gateway. It charges tokenized
//! cards, looks purchases up by merchant reference, fetches stored cards and
//! verifies the signed results of direct (browser-to-gateway) card tokenization.
//!
//! # What does it guard?
//!
//! - **Spending ceiling**: every client carries a maximum purchase amount, and a
//!   purchase above it is refused before any request is built.
//! - **Credential scope**: gateway credentials are attached only to HTTPS
//!   requests for the configured gateway host, never to anything else.
//! - **Signed redirects**: a tokenize result cannot be read as trusted until its
//!   HMAC signature has been checked against the merchant's shared secret.
//! - **Exact money**: amounts are integer cents end to end.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Merchant code  │
//! └────────┬────────┘
//!          │ do_purchase / purchase_by_reference / tokenized_card
//!          │
//! ┌────────▼────────────────────────────────────────┐
//! │                 GatewayClient                   │
//! │  ┌──────────────┐      ┌──────────────────┐    │
//! │  │   ceiling    │      │  MessageSigner   │    │
//! │  │   (Amount)   │      │  (HMAC-MD5)      │    │
//! │  └──────────────┘      └──────────────────┘    │
//! │  ┌──────────────────────────────────────────┐  │
//! │  │ CredentialTransport ─▶ HttpSend (reqwest)│  │
//! │  └──────────────────────────────────────────┘  │
//! └────────┬───────────────────────────────────────┘
//!          │ HTTPS + Basic Auth
//!          │
//! ┌────────▼────────┐
//! │  Fat Zebra API  │  /v1.0/purchases, /v1.0/credit_cards
//! └─────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## 1. Charge a Card
//!
//! ```rust,no_run
//! use fatzebra::{
//!     Amount, CallContext, Credentials, Environment, GatewayClient, GatewayConfig,
//!     GatewayError, PurchaseRequest, generate_reference,
//! };
//!
//! # async fn example() -> fatzebra::Result<()> {
//! let config = GatewayConfig::new(Environment::Sandbox, Amount::from_dollars(1500.0));
//! let client = GatewayClient::with_default_sender(&config, Credentials::from_env(&config.auth)?)?;
//!
//! let reference = generate_reference("SHOP-");
//! let request = PurchaseRequest::new("card-token", Amount::from_dollars(42.50), &reference, "203.0.113.7");
//!
//! match client.do_purchase(&CallContext::new(), &request).await {
//!     Ok(purchase) if purchase.successful => println!("approved: {}", purchase.id),
//!     Ok(purchase) => println!("declined: {}", purchase.message),
//!     Err(GatewayError::Validation { errors, .. }) => println!("rejected: {errors:?}"),
//!     Err(err) if err.is_transient() => {
//!         // The charge may or may not have happened. Ask the gateway.
//!         let purchase = client.purchase_by_reference(&CallContext::new(), &reference).await?;
//!         println!("recovered: {}", purchase.id);
//!     }
//!     Err(err) => return Err(err),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## 2. Accept a Direct Tokenization Result
//!
//! ```rust
//! use fatzebra::{Amount, Credentials, Environment, GatewayClient, GatewayConfig, signing::MessageSigner};
//!
//! # fn example() -> fatzebra::Result<()> {
//! let config = GatewayConfig::new(Environment::Sandbox, Amount::from_dollars(1500.0));
//! let credentials = Credentials::new("TEST", "TEST".to_owned().into(), "secret".to_owned().into());
//! let client = GatewayClient::with_default_sender(&config, credentials)?;
//!
//! // Signature the gateway would have put on the redirect.
//! let v = MessageSigner::new("secret".to_owned().into()).sign_tokenize(1, "abc123");
//!
//! let redirect = http::Request::get(format!("https://shop.example/cards?r=1&token=abc123&v={v}"))
//!     .body(Vec::<u8>::new())
//!     .map_err(|e| fatzebra::GatewayError::InvalidInput(e.to_string()))?;
//!
//! let result = client.parse_direct_tokenize_result(&redirect)?;
//! assert!(result.is_successful());
//! assert_eq!(result.card_token(), "abc123");
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`client`]: gateway operations
//! - [`config`]: TOML configuration and credential loading
//! - [`context`]: per-call cancellation and timeout
//! - [`envelope`]: the gateway's JSON response wrapper
//! - [`error`]: error types
//! - [`money`]: integer-cent amounts
//! - [`purchase`]: purchase request and response types
//! - [`reference`]: random purchase references
//! - [`signing`]: HMAC-MD5 signing and verification
//! - [`tokenize`]: direct tokenization results and stored cards
//! - [`transport`]: pluggable HTTP sending and credential injection
//!
//! # Security Considerations
//!
//! ## Secrets
//!
//! The password and shared secret are held in [`secrecy::SecretString`]. They
//! do not appear in `Debug` output or logs. The `Authorization` header is
//! marked sensitive.
//!
//! ## Redirects
//!
//! The default sender does not follow redirects. Requests to any host other
//! than the gateway go out without credentials.
//!
//! ## Signature algorithm
//!
//! HMAC-MD5 is what the gateway uses for the redirect channel. It is compared
//! in constant time.
//!
//! # Error Handling
//!
//! All operations return [`Result<T, GatewayError>`](Result). The library never
//! retries: see [`GatewayError::is_transient`].

#![warn(missing_debug_implementations)]

pub mod client;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod money;
pub mod purchase;
pub mod reference;
pub mod signing;
pub mod tokenize;
pub mod transport;

pub use client::GatewayClient;
pub use config::{Credentials, Environment, GatewayConfig};
pub use context::CallContext;
pub use error::{GatewayError, Result};
pub use money::Amount;
pub use purchase::{Purchase, PurchaseRequest};
pub use reference::generate_reference;
pub use tokenize::{TokenizeCode, TokenizeResult, TokenizedCard, UnverifiedTokenizeResult};
