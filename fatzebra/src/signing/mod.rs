//! Shared-secret message authentication.
//!
//! The gateway and the merchant share a secret. It authenticates two messages
//! that travel through the customer's browser instead of the Basic-Auth channel:
//!
//! - **Outbound**: the merchant signs the redirect URL it hands to the direct
//!   tokenize form ([`MessageSigner::sign`]).
//! - **Inbound**: the gateway signs `"<code>:<token>"` on the tokenize result it
//!   redirects back ([`MessageSigner::verify_tokenize`]).
//!
//! Digests are HMAC-MD5, hex encoded. Each call builds a fresh keyed HMAC over
//! exactly the bytes being signed, so a [`MessageSigner`] carries no state
//! between calls and can be shared freely across threads.
//!
//! # Examples
//!
//! ```
//! use fatzebra::signing::MessageSigner;
//!
//! # fn example() -> fatzebra::Result<()> {
//! let signer = MessageSigner::new("shared-secret".to_owned().into());
//!
//! let digest = signer.sign(b"https://shop.example.com/card-added");
//! signer.verify(b"https://shop.example.com/card-added", &digest)?;
//! # Ok(())
//! # }
//! ```

use std::fmt::Display;

use hmac::{Hmac, Mac};
use md5::Md5;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::error::{GatewayError, Result};

#[cfg(test)]
mod tests;

type HmacMd5 = Hmac<Md5>;

/// Signs and verifies messages with the gateway shared secret.
///
/// Holds the secret and nothing else. `Debug` output redacts it.
#[derive(Debug)]
pub struct MessageSigner {
    secret: SecretString,
}

impl MessageSigner {
    /// Creates a signer for the given shared secret.
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Signs `payload`, returning the lowercase hex HMAC digest.
    #[must_use]
    pub fn sign(&self, payload: &[u8]) -> String {
        hex::encode(self.keyed().chain_update(payload).finalize().into_bytes())
    }

    /// Verifies that `digest_hex` is the signature of `payload`.
    ///
    /// The comparison runs in constant time. A digest that is not valid hex is
    /// rejected the same way as a wrong one.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BadSignature`] if the digest does not match.
    pub fn verify(&self, payload: &[u8], digest_hex: &str) -> Result<()> {
        let Ok(claimed) = hex::decode(digest_hex) else {
            warn!("rejected signature: digest is not hex");
            return Err(GatewayError::BadSignature);
        };

        self.keyed().chain_update(payload).verify_slice(&claimed).map_err(|_| {
            warn!("rejected signature: digest mismatch");
            GatewayError::BadSignature
        })?;

        debug!("signature verified");
        Ok(())
    }

    /// Verifies the gateway's signature over a tokenize result.
    ///
    /// The signed payload is `"<code>:<token>"`. Nothing else in a tokenize
    /// result is covered.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BadSignature`] if the digest does not match.
    pub fn verify_tokenize(&self, code: impl Display, token: &str, digest_hex: &str) -> Result<()> {
        self.verify(tokenize_payload(code, token).as_bytes(), digest_hex)
    }

    /// Signs a tokenize result the way the gateway does.
    #[must_use]
    pub fn sign_tokenize(&self, code: impl Display, token: &str) -> String {
        self.sign(tokenize_payload(code, token).as_bytes())
    }

    /// Builds a freshly keyed HMAC for a single computation.
    #[allow(clippy::expect_used, reason = "HMAC accepts keys of any length")]
    fn keyed(&self) -> HmacMd5 {
        HmacMd5::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts keys of any length")
    }
}

/// Canonical payload covered by a tokenize result signature.
fn tokenize_payload(code: impl Display, token: &str) -> String {
    format!("{code}:{token}")
}
