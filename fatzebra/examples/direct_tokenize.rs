//! Signs a redirect URL for the direct tokenization form and verifies the
//! result the gateway sends back. Runs offline.
//!
//! # Running this example
//!
//! ```bash
//! cargo run --example direct_tokenize
//! ```

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "examples are allowed to use println"
)]

use fatzebra::{
    Amount, Credentials, Environment, GatewayClient, GatewayConfig, GatewayError,
    signing::MessageSigner,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let secret = "example-shared-secret";
    let config = GatewayConfig::new(Environment::Sandbox, Amount::from_dollars(100.0));
    let credentials = Credentials::new("TEST", "TEST".to_owned().into(), secret.to_owned().into());
    let client = GatewayClient::with_default_sender(&config, credentials)?;

    let return_url = "https://shop.example/cards/return";
    println!("Form field `return_path`: {return_url}");
    println!("Form field `verification`: {}\n", client.tokenize_hash(return_url));

    // What the gateway appends to the return URL after tokenizing a card.
    let v = MessageSigner::new(secret.to_owned().into()).sign_tokenize(1, "a1bhj98j");
    let redirect = http::Request::get(format!("{return_url}?r=1&token=a1bhj98j&v={v}"))
        .body(Vec::<u8>::new())?;

    let result = client.parse_direct_tokenize_result(&redirect)?;
    println!("Verified: {} token={}", result.code(), result.card_token());

    // A tampered token no longer matches the signature.
    let forged = http::Request::get(format!("{return_url}?r=1&token=someone-else&v={v}"))
        .body(Vec::<u8>::new())?;
    match client.parse_direct_tokenize_result(&forged) {
        Err(GatewayError::BadSignature) => println!("Forgery rejected"),
        other => eprintln!("unexpected: {other:?}"),
    }

    Ok(())
}
