use std::{sync::Arc, thread};

use super::*;


fn signer(secret: &str) -> MessageSigner {
    MessageSigner::new(secret.to_owned().into())
}

#[test]
fn test_sign_matches_rfc2104_vector() {
    let signer = signer("Jefe");
    assert_eq!(signer.sign(b"what do ya want for nothing?"), "750c783e6ab0b503eaa86e310a5db738");
}

#[test]
fn test_repeated_signing_is_stable() {
    // A signer that accumulated state between calls would drift here.
    let signer = signer("secret");
    let first = signer.sign(b"payload");
    let second = signer.sign(b"payload");
    let third = signer.sign(b"payload");
    assert_eq!(first, second);
    assert_eq!(second, third);
}

#[test]
fn test_sign_then_verify() {
    let signer = signer("secret");
    let digest = signer.sign(b"https://shop.example.com/return");
    assert!(signer.verify(b"https://shop.example.com/return", &digest).is_ok());
}

#[test]
fn test_verify_rejects_flipped_bit() {
    let signer = signer("secret");
    let mut digest = hex::decode(signer.sign(b"payload")).unwrap();
    digest[0] ^= 0x01;

    let result = signer.verify(b"payload", &hex::encode(digest));
    assert!(matches!(result, Err(GatewayError::BadSignature)));
}

#[test]
fn test_verify_rejects_other_secret() {
    let digest = signer("secret").sign(b"payload");
    let result = signer("other-secret").verify(b"payload", &digest);
    assert!(matches!(result, Err(GatewayError::BadSignature)));
}

#[test]
fn test_verify_rejects_malformed_digest() {
    let signer = signer("secret");
    assert!(matches!(signer.verify(b"payload", "not-hex"), Err(GatewayError::BadSignature)));
    assert!(matches!(signer.verify(b"payload", ""), Err(GatewayError::BadSignature)));
    // Valid hex, wrong length.
    assert!(matches!(signer.verify(b"payload", "abcd"), Err(GatewayError::BadSignature)));
}

#[test]
fn test_verify_accepts_uppercase_hex() {
    let signer = signer("secret");
    let digest = signer.sign(b"payload").to_uppercase();
    assert!(signer.verify(b"payload", &digest).is_ok());
}

#[test]
fn test_tokenize_payload_format() {
    let signer = signer("secret");
    assert_eq!(signer.sign_tokenize(1, "abc123"), signer.sign(b"1:abc123"));
    assert!(signer.verify_tokenize(1, "abc123", &signer.sign(b"1:abc123")).is_ok());
}

#[test]
fn test_verify_tokenize_binds_code_and_token() {
    let signer = signer("secret");
    let digest = signer.sign_tokenize(1, "token-a");

    assert!(signer.verify_tokenize(97, "token-a", &digest).is_err());
    assert!(signer.verify_tokenize(1, "token-b", &digest).is_err());
}

#[test]
fn test_debug_redacts_secret() {
    let signer = signer("super-secret-value");
    let debug = format!("{signer:?}");
    assert!(!debug.contains("super-secret-value"));
}

#[test]
fn test_concurrent_verification_is_independent() {
    let signer = Arc::new(signer("shared"));
    let messages: Vec<(String, String)> = (0..64)
        .map(|i| {
            let payload = format!("{i}:token-{i}");
            let digest = signer.sign(payload.as_bytes());
            (payload, digest)
        })
        .collect();

    let handles: Vec<_> = messages
        .into_iter()
        .enumerate()
        .map(|(i, (payload, digest))| {
            let signer = Arc::clone(&signer);
            thread::spawn(move || {
                let mut ok = true;
                for _ in 0..50 {
                    ok &= signer.verify(payload.as_bytes(), &digest).is_ok();
                    // Every other thread also checks a forgery so good and bad
                    // verifications interleave.
                    if i % 2 == 0 {
                        ok &= signer.verify(b"forged", &digest).is_err();
                    }
                }
                ok
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
