//! Command-line client for the Fat Zebra gateway.
//!
//! Reads a TOML configuration file (`--config` or `FATZEBRA_CONFIG`) and takes
//! credentials from the environment variables it names. Command output is
//! written to stdout as JSON; logs go to stderr.
//!
//! Ctrl-C cancels an in-flight gateway call.

mod check;
mod observability;

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fatzebra::{
    Amount, CallContext, Credentials, GatewayClient, GatewayConfig, PurchaseRequest,
    UnverifiedTokenizeResult, generate_reference,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    check::CheckReport,
    observability::{LogFormat, init_observability},
};

#[derive(Debug, Parser)]
#[command(name = "fatzebra", author, version, about, long_about = None)]
struct Cli {
    /// Gateway configuration file (TOML)
    #[arg(long, short, env = "FATZEBRA_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log format; defaults to `LOG_FORMAT`, then pretty
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    /// Abandon gateway calls after this many seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print new random purchase references
    Reference {
        /// Prefix for each reference
        #[arg(long, default_value = "")]
        prefix: String,

        /// How many references to print
        #[arg(long, default_value_t = 1)]
        count: usize,
    },

    /// Charge a tokenized card
    Purchase(PurchaseArgs),

    /// Look a purchase up by its reference
    Lookup {
        /// Merchant reference
        reference: String,
    },

    /// Show a stored card
    Card {
        /// Card token
        token: String,
    },

    /// Sign a redirect URL for the direct tokenization form
    TokenizeHash {
        /// URL the gateway should redirect to
        redirect_url: String,
    },

    /// Verify a direct tokenization result given as a query string
    Verify {
        /// Query string, e.g. `r=1&token=...&v=...`
        query: String,
    },

    /// Check configuration and credentials without contacting the gateway
    Check,
}

#[derive(Debug, Args)]
struct PurchaseArgs {
    /// Token of the card to charge
    #[arg(long)]
    card_token: String,

    /// Amount in dollars, e.g. `12.50`
    #[arg(long)]
    amount: Decimal,

    /// IP address of the customer
    #[arg(long)]
    customer_ip: String,

    /// Merchant reference; generated when omitted
    #[arg(long)]
    reference: Option<String>,

    /// Prefix for a generated reference
    #[arg(long, default_value = "")]
    reference_prefix: String,

    /// Card verification value
    #[arg(long)]
    cvv: Option<String>,

    /// Authorize without capturing
    #[arg(long)]
    authorize_only: bool,
}

impl PurchaseArgs {
    fn into_request(self) -> Result<PurchaseRequest> {
        let amount = Amount::from_decimal(self.amount)?;
        let reference =
            self.reference.unwrap_or_else(|| generate_reference(&self.reference_prefix));

        let mut request = PurchaseRequest::new(self.card_token, amount, reference, self.customer_ip);
        if let Some(cvv) = self.cvv {
            request = request.with_cvv(cvv);
        }
        if self.authorize_only {
            request = request.authorize_only();
        }
        Ok(request)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_observability(cli.log_format.unwrap_or_else(LogFormat::from_env));

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling");
                shutdown.cancel();
            }
        }
    });

    let mut ctx = CallContext::new().with_cancellation(shutdown.child_token());
    if let Some(secs) = cli.timeout_secs {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    match run(cli.command, cli.config.as_deref(), &ctx).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Option<&Path>, ctx: &CallContext) -> Result<ExitCode> {
    match command {
        Command::Reference { prefix, count } => {
            for _ in 0..count {
                println!("{}", generate_reference(&prefix));
            }
        }
        Command::Purchase(args) => {
            let client = client(config)?;
            let purchase = client.do_purchase(ctx, &args.into_request()?).await?;
            print_json(&purchase)?;
            if !purchase.successful {
                return Ok(ExitCode::from(2));
            }
        }
        Command::Lookup { reference } => {
            let purchase = client(config)?.purchase_by_reference(ctx, &reference).await?;
            print_json(&purchase)?;
        }
        Command::Card { token } => {
            let card = client(config)?.tokenized_card(ctx, &token).await?;
            print_json(&card)?;
        }
        Command::TokenizeHash { redirect_url } => {
            println!("{}", client(config)?.tokenize_hash(&redirect_url));
        }
        Command::Verify { query } => {
            let query = query.trim_start_matches('?');
            let result = client(config)?
                .verify_tokenize_result(UnverifiedTokenizeResult::from_query(query)?)?;
            print_json(&json!({
                "code": result.code().as_i64(),
                "status": result.code().to_string(),
                "card_token": result.card_token(),
                "errors": result.errors(),
            }))?;
        }
        Command::Check => {
            let report = CheckReport::run(config, |name| std::env::var(name).ok());
            println!("{}", report.to_json()?);
            if !report.passed() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    let path = path.context("no configuration file: pass --config or set FATZEBRA_CONFIG")?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    GatewayConfig::from_toml(&text).with_context(|| format!("invalid configuration in {}", path.display()))
}

fn client(config: Option<&Path>) -> Result<GatewayClient> {
    let config = load_config(config)?;
    let credentials = Credentials::from_env(&config.auth)?;
    Ok(GatewayClient::with_default_sender(&config, credentials)?)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
