//! Purchase request and response types.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{envelope::null_as_default, money::Amount};

/// A purchase against a tokenized card.
///
/// `capture` must be `true` for a purchase; `false` places a hold
/// (authorization only).
///
/// # Examples
///
/// ```
/// use fatzebra::{Amount, PurchaseRequest, generate_reference};
///
/// let request = PurchaseRequest::new(
///     "card-token",
///     Amount::from_dollars(12.50),
///     generate_reference("SHOP-"),
///     "203.0.113.7",
/// )
/// .with_cvv("123");
///
/// assert!(request.capture);
/// assert!(format!("{request:?}").contains("[REDACTED]"));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseRequest {
    /// Token of the card to charge.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub card_token: String,

    /// Card verification value, if collected for this purchase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvv: Option<String>,

    /// Amount to charge.
    pub amount: Amount,

    /// Merchant reference. Should be unique per purchase; see
    /// [`generate_reference`](crate::generate_reference).
    pub reference: String,

    /// Capture immediately (`true`) or authorize only (`false`).
    pub capture: bool,

    /// IP address of the customer. Required by the gateway.
    pub customer_ip: String,
}

impl PurchaseRequest {
    /// Creates a capturing purchase without a CVV.
    #[must_use]
    pub fn new(
        card_token: impl Into<String>,
        amount: Amount,
        reference: impl Into<String>,
        customer_ip: impl Into<String>,
    ) -> Self {
        Self {
            card_token: card_token.into(),
            cvv: None,
            amount,
            reference: reference.into(),
            capture: true,
            customer_ip: customer_ip.into(),
        }
    }

    /// Sets the CVV.
    #[must_use]
    pub fn with_cvv(mut self, cvv: impl Into<String>) -> Self {
        self.cvv = Some(cvv.into());
        self
    }

    /// Authorizes without capturing.
    #[must_use]
    pub fn authorize_only(mut self) -> Self {
        self.capture = false;
        self
    }
}

impl fmt::Debug for PurchaseRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurchaseRequest")
            .field("card_token", &self.card_token)
            .field("cvv", &self.cvv.as_ref().map(|_| "[REDACTED]"))
            .field("amount", &self.amount)
            .field("reference", &self.reference)
            .field("capture", &self.capture)
            .field("customer_ip", &self.customer_ip)
            .finish()
    }
}

/// A purchase as recorded by the gateway.
///
/// A declined card is still a `Purchase`: check [`successful`](Self::successful)
/// and [`message`](Self::message). Only requests the gateway refused to process
/// surface as [`GatewayError::Validation`](crate::GatewayError::Validation).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Purchase {
    /// Authorization code from the issuer.
    #[serde(deserialize_with = "null_as_default")]
    pub authorization: String,
    /// Gateway transaction ID.
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    /// Masked card number.
    #[serde(deserialize_with = "null_as_default")]
    pub card_number: String,
    /// Name on the card.
    #[serde(deserialize_with = "null_as_default")]
    pub card_holder: String,
    /// Card expiry as reported by the gateway.
    #[serde(deserialize_with = "null_as_default")]
    pub card_expiry: String,
    /// Token of the card that was charged.
    #[serde(deserialize_with = "null_as_default")]
    pub card_token: String,
    /// Card scheme, e.g. `VISA`.
    #[serde(deserialize_with = "null_as_default")]
    pub card_type: String,
    /// Card category, e.g. `Credit`.
    #[serde(deserialize_with = "null_as_default")]
    pub card_category: String,
    /// Card subcategory.
    #[serde(deserialize_with = "null_as_default")]
    pub card_subcategory: String,
    /// Amount charged.
    #[serde(deserialize_with = "null_as_default")]
    pub amount: Amount,
    /// Whether the charge was approved.
    #[serde(deserialize_with = "null_as_default")]
    pub successful: bool,
    /// Response message, e.g. `Approved`.
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    /// Merchant reference.
    #[serde(deserialize_with = "null_as_default")]
    pub reference: String,
    /// ISO currency code.
    #[serde(deserialize_with = "null_as_default")]
    pub currency: String,
    /// Acquirer transaction ID.
    #[serde(deserialize_with = "null_as_default")]
    pub transaction_id: String,
    /// Settlement date.
    #[serde(deserialize_with = "null_as_default")]
    pub settlement_date: String,
    /// When the transaction was processed.
    pub transaction_date: Option<DateTime<FixedOffset>>,
    /// Bank response code.
    #[serde(deserialize_with = "null_as_default")]
    pub response_code: String,
    /// Whether the funds were captured.
    #[serde(deserialize_with = "null_as_default")]
    pub captured: bool,
    /// Amount captured so far.
    #[serde(deserialize_with = "null_as_default")]
    pub captured_amount: Amount,
    /// Retrieval reference number.
    #[serde(deserialize_with = "null_as_default")]
    pub rrn: String,
    /// CVV match result.
    #[serde(deserialize_with = "null_as_default")]
    pub cvv_match: String,
}
