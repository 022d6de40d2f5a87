//! Direct tokenization results and tokenized cards.
//!
//! With direct tokenization the card form posts straight to the gateway, which
//! answers the merchant's page with a result signed by the shared secret. The
//! result arrives either as a JSON POST or as query parameters on a redirect:
//!
//! | field      | meaning                                         |
//! |------------|-------------------------------------------------|
//! | `r`        | [`TokenizeCode`]                                |
//! | `token`    | card token                                      |
//! | `v`        | hex HMAC-MD5 of `"<r>:<token>"`                 |
//! | `errors[]` | error messages (JSON: `errors[]` or `errors`)   |
//!
//! Nothing in an [`UnverifiedTokenizeResult`] may be trusted. A
//! [`TokenizeResult`] can only be obtained by verifying one.

use std::fmt;

use ::http::{Method, Request};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    envelope::null_as_default,
    error::{GatewayError, Result},
    signing::MessageSigner,
};

/// Outcome code of a direct tokenization.
///
/// # Examples
///
/// ```
/// use fatzebra::TokenizeCode;
///
/// assert_eq!(TokenizeCode::from(97), TokenizeCode::ValidationError);
/// assert_eq!(TokenizeCode::from(42).to_string(), "Unknown");
/// assert_eq!(TokenizeCode::Successful.as_i64(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum TokenizeCode {
    /// The card was tokenized (`1`).
    Successful,
    /// The card details failed validation (`97`).
    ValidationError,
    /// The request's own verification failed (`99`).
    InvalidVerification,
    /// The gateway failed (`999`).
    GatewayError,
    /// Any other code.
    Unknown(i64),
}

impl TokenizeCode {
    /// Returns the numeric code used on the wire and in the signed payload.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Successful => 1,
            Self::ValidationError => 97,
            Self::InvalidVerification => 99,
            Self::GatewayError => 999,
            Self::Unknown(code) => code,
        }
    }
}

impl From<i64> for TokenizeCode {
    fn from(code: i64) -> Self {
        match code {
            1 => Self::Successful,
            97 => Self::ValidationError,
            99 => Self::InvalidVerification,
            999 => Self::GatewayError,
            other => Self::Unknown(other),
        }
    }
}

impl From<TokenizeCode> for i64 {
    fn from(code: TokenizeCode) -> Self {
        code.as_i64()
    }
}

impl fmt::Display for TokenizeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Successful => "Successful",
            Self::ValidationError => "ValidationError",
            Self::InvalidVerification => "InvalidVerification",
            Self::GatewayError => "GatewayError",
            Self::Unknown(_) => "Unknown",
        })
    }
}

/// A tokenize result as received, before its signature is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnverifiedTokenizeResult {
    /// Claimed outcome.
    #[serde(rename = "r")]
    pub code: TokenizeCode,

    /// Claimed card token.
    #[serde(rename = "token")]
    pub card_token: String,

    /// Hex signature over code and token.
    #[serde(rename = "v")]
    pub verification: String,

    /// Error messages. Not covered by the signature.
    #[serde(rename = "errors[]", alias = "errors", default, deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
}

impl UnverifiedTokenizeResult {
    /// Reads a result from an inbound request.
    ///
    /// A `POST` is read as a JSON body. Any other method is read from the
    /// query string.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] if a field is missing or `r` is
    /// not an integer.
    pub fn from_request<B: AsRef<[u8]>>(request: &Request<B>) -> Result<Self> {
        if request.method() == Method::POST {
            Self::from_json(request.body().as_ref())
        } else {
            Self::from_query(request.uri().query().unwrap_or_default())
        }
    }

    /// Reads a result from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] if the document does not have
    /// the expected shape.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| GatewayError::InvalidInput(format!("malformed tokenize result: {e}")))
    }

    /// Reads a result from a URL query string (without the leading `?`).
    ///
    /// Errors may be given as repeated `errors` or `errors[]` parameters.
    /// When a field other than `errors` repeats, the first value wins.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] if `r`, `token` or `v` is
    /// missing, or `r` is not an integer.
    pub fn from_query(query: &str) -> Result<Self> {
        let mut code = None;
        let mut card_token = None;
        let mut verification = None;
        let mut errors = Vec::new();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "r" => {
                    code.get_or_insert(value);
                }
                "token" => {
                    card_token.get_or_insert(value);
                }
                "v" => {
                    verification.get_or_insert(value);
                }
                "errors" | "errors[]" => errors.push(value.into_owned()),
                _ => {}
            }
        }

        let missing = |name: &str| GatewayError::InvalidInput(format!("missing parameter `{name}`"));
        let code = code.ok_or_else(|| missing("r"))?;
        let code: i64 = code
            .trim()
            .parse()
            .map_err(|_| GatewayError::InvalidInput(format!("`r` is not an integer: {code}")))?;

        Ok(Self {
            code: code.into(),
            card_token: card_token.ok_or_else(|| missing("token"))?.into_owned(),
            verification: verification.ok_or_else(|| missing("v"))?.into_owned(),
            errors,
        })
    }

    /// Checks the signature and, on success, returns the trusted result.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BadSignature`] if `v` is not the signature of
    /// `"<r>:<token>"` under `signer`'s secret.
    pub fn verify(self, signer: &MessageSigner) -> Result<TokenizeResult> {
        signer.verify_tokenize(self.code.as_i64(), &self.card_token, &self.verification)?;
        debug!(code = %self.code, "tokenize result verified");

        Ok(TokenizeResult { code: self.code, card_token: self.card_token, errors: self.errors })
    }
}

/// A tokenize result whose signature has been verified.
///
/// Code and card token are authenticated. The error messages travel alongside
/// but are not signed; show them to the user, do not act on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizeResult {
    code: TokenizeCode,
    card_token: String,
    errors: Vec<String>,
}

impl TokenizeResult {
    /// Verified outcome code.
    #[must_use]
    pub fn code(&self) -> TokenizeCode {
        self.code
    }

    /// Verified card token.
    #[must_use]
    pub fn card_token(&self) -> &str {
        &self.card_token
    }

    /// Returns `true` if the card was tokenized.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.code == TokenizeCode::Successful
    }

    /// Error messages. Unsigned.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

/// A stored card as returned by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizedCard {
    /// Card token.
    #[serde(deserialize_with = "null_as_default")]
    pub token: String,
    /// Name on the card.
    #[serde(deserialize_with = "null_as_default")]
    pub card_holder: String,
    /// Masked card number.
    #[serde(deserialize_with = "null_as_default")]
    pub card_number: String,
    /// Card expiry as reported by the gateway.
    #[serde(deserialize_with = "null_as_default")]
    pub card_expiry: String,
    /// Card scheme, e.g. `VISA`.
    #[serde(deserialize_with = "null_as_default")]
    pub card_type: String,
    /// Card category, e.g. `Credit`.
    #[serde(deserialize_with = "null_as_default")]
    pub card_category: String,
    /// Card subcategory.
    #[serde(deserialize_with = "null_as_default")]
    pub card_subcategory: String,
    /// Issuing bank.
    #[serde(deserialize_with = "null_as_default")]
    pub card_issuer: String,
    /// Issuing country code.
    #[serde(deserialize_with = "null_as_default")]
    pub card_country: String,
    /// Whether the card has been authorized at least once.
    #[serde(deserialize_with = "null_as_default")]
    pub authorized: bool,
    /// Transactions made with this token.
    #[serde(deserialize_with = "null_as_default")]
    pub transaction_count: u64,
}
