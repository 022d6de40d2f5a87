//! Charges a tokenized card against the sandbox gateway and recovers from a
//! lost response by looking the purchase up by its reference.
//!
//! # Running this example
//!
//! ```bash
//! export FATZEBRA_USERNAME=TEST FATZEBRA_TOKEN=TEST FATZEBRA_SHARED_SECRET=...
//! cargo run --example purchase_with_recovery -- <card-token>
//! ```

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "examples are allowed to use println"
)]

use std::time::Duration;

use fatzebra::{
    Amount, CallContext, Credentials, Environment, GatewayClient, GatewayConfig, GatewayError,
    PurchaseRequest, generate_reference,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let card_token = std::env::args().nth(1).ok_or("usage: purchase_with_recovery <card-token>")?;

    let config = GatewayConfig::new(Environment::Sandbox, Amount::from_dollars(100.0));
    let client = GatewayClient::with_default_sender(&config, Credentials::from_env(&config.auth)?)?;
    let ctx = CallContext::new().with_timeout(Duration::from_secs(20));

    // Keep the reference: it is the only handle on a purchase whose response is lost.
    let reference = generate_reference("EXAMPLE-");
    let request = PurchaseRequest::new(card_token, Amount::from_dollars(10.0), &reference, "127.0.0.1");

    println!("Example 1: purchase {reference}");
    match client.do_purchase(&ctx, &request).await {
        Ok(purchase) if purchase.successful => println!("   approved: {}", purchase.id),
        Ok(purchase) => println!("   declined: {}", purchase.message),
        Err(GatewayError::Validation { errors, .. }) => {
            println!("   rejected, nothing recorded: {errors:?}");
        }
        Err(err) if err.is_transient() => {
            println!("   outcome unknown ({err}), asking the gateway");
            match client.purchase_by_reference(&ctx, &reference).await {
                Ok(purchase) => println!("   found: {} successful={}", purchase.id, purchase.successful),
                Err(GatewayError::NotFound) => println!("   never reached the gateway"),
                Err(err) => return Err(err.into()),
            }
        }
        Err(err) => return Err(err.into()),
    }

    println!("\nExample 2: purchase above the ceiling");
    let oversized = PurchaseRequest::new("any", Amount::from_dollars(100.01), generate_reference("EXAMPLE-"), "127.0.0.1");
    match client.do_purchase(&ctx, &oversized).await {
        Err(err @ GatewayError::ExceedsMaximum { .. }) => println!("   refused locally: {err}"),
        other => eprintln!("   unexpected: {other:?}"),
    }

    Ok(())
}
