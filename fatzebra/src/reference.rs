//! Purchase reference generation.

use rand::{Rng, rngs::OsRng};

/// Smallest 12-digit base-36 number, `36^11`.
const REFERENCE_MIN: u64 = 36u64.pow(11);

/// One past the largest 12-digit base-36 number, `36^12`.
const REFERENCE_MAX: u64 = 36u64.pow(12);

const BASE36_DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates a random purchase reference.
///
/// The result is `prefix` followed by 12 upper-case base-36 characters drawn
/// uniformly from the operating system's secure random source. Collisions are
/// possible in principle but not checked for.
///
/// Generate the reference before building a purchase request and keep it: the
/// gateway does not record purchases that fail validation, so the reference is
/// the only handle for correlating a retry.
///
/// A prefix helps support staff: a customer who contacts the wrong merchant can
/// be spotted by the missing prefix.
///
/// # Panics
///
/// Panics if the operating system's random source is unavailable. There is no
/// weaker fallback.
///
/// # Examples
///
/// ```
/// use fatzebra::generate_reference;
///
/// let reference = generate_reference("SHOP-");
/// assert!(reference.starts_with("SHOP-"));
/// assert_eq!(reference.len(), "SHOP-".len() + 12);
/// ```
#[must_use]
pub fn generate_reference(prefix: &str) -> String {
    let value = OsRng.gen_range(REFERENCE_MIN..REFERENCE_MAX);
    let mut reference = String::with_capacity(prefix.len() + 12);
    reference.push_str(prefix);
    reference.push_str(&encode_base36(value));
    reference
}

/// Encodes `value` in upper-case base 36 without leading zeros.
fn encode_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_owned();
    }

    let mut digits = Vec::with_capacity(13);
    while value > 0 {
        #[allow(clippy::cast_possible_truncation, reason = "remainder is always below 36")]
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();

    digits.into_iter().map(char::from).collect()
}
