//! Client configuration.
//!
//! [`GatewayConfig`] is deserialized from TOML. Credentials are never written
//! into the file; the `[auth]` table names the environment variables that hold
//! them, and [`Credentials::from_env`] resolves them at startup.
//!
//! # Examples
//!
//! ```toml
//! environment = "sandbox"
//! max_amount_cents = 150000
//!
//! [auth]
//! username_env = "FATZEBRA_USERNAME"
//! password_env = "FATZEBRA_TOKEN"
//! secret_env = "FATZEBRA_SHARED_SECRET"
//!
//! [http]
//! timeout_secs = 30
//! ```

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::{
    error::{GatewayError, Result},
    money::Amount,
    transport::HttpConfig,
};

/// Sandbox gateway host.
pub const SANDBOX_HOST: &str = "gateway.sandbox.fatzebra.com.au";

/// Production gateway host.
pub const PRODUCTION_HOST: &str = "gateway.fatzebra.com.au";

/// Default API path prefix.
pub const DEFAULT_API_PREFIX: &str = "/v1.0";

/// Gateway environment preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Test gateway. No real money moves.
    #[default]
    Sandbox,
    /// Live gateway.
    Production,
}

impl Environment {
    /// Returns the gateway host for this environment.
    #[must_use]
    pub const fn host(self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_HOST,
            Self::Production => PRODUCTION_HOST,
        }
    }
}

/// Gateway client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Environment preset used when `host` is not set.
    #[serde(default)]
    pub environment: Environment,

    /// Explicit gateway host, overriding `environment`. May include a port.
    #[serde(default)]
    pub host: Option<String>,

    /// API path prefix (default `/v1.0`).
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Largest amount a single purchase may charge, in cents. Must be positive.
    pub max_amount_cents: i64,

    /// Names of the environment variables holding credentials.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Settings for the default HTTP sender.
    #[serde(default)]
    pub http: HttpConfig,
}

impl GatewayConfig {
    /// Creates a config for `environment` with the given ceiling and defaults elsewhere.
    #[must_use]
    pub fn new(environment: Environment, max_amount: Amount) -> Self {
        Self {
            environment,
            host: None,
            api_prefix: default_api_prefix(),
            max_amount_cents: max_amount.cents(),
            auth: AuthConfig::default(),
            http: HttpConfig::default(),
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the TOML is malformed or a
    /// value fails [`validate`](Self::validate).
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml)
            .map_err(|e| GatewayError::Configuration(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides the gateway host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Returns the effective gateway host.
    #[must_use]
    pub fn gateway_host(&self) -> &str {
        self.host.as_deref().unwrap_or_else(|| self.environment.host())
    }

    /// Returns the purchase ceiling.
    #[must_use]
    pub fn max_amount(&self) -> Amount {
        Amount::from_cents(self.max_amount_cents)
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if:
    /// - `max_amount_cents` is not positive
    /// - the host is not a plain `host[:port]` authority
    /// - `api_prefix` is not empty and does not start with `/`, or contains `..`
    /// - the `[auth]` or `[http]` tables are invalid
    pub fn validate(&self) -> Result<()> {
        if self.max_amount_cents <= 0 {
            return Err(GatewayError::Configuration(
                "maximum amount must be greater than 0".to_owned(),
            ));
        }

        canonical_host(self.gateway_host())?;

        if !self.api_prefix.is_empty()
            && (!self.api_prefix.starts_with('/') || self.api_prefix.contains(".."))
        {
            return Err(GatewayError::Configuration(format!(
                "api_prefix must start with '/' and not contain '..': {}",
                self.api_prefix
            )));
        }

        self.auth.validate()?;
        self.http.validate()
    }
}

/// Environment variable names for the gateway credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Variable holding the API username.
    #[serde(default = "default_username_env")]
    pub username_env: String,
    /// Variable holding the API token (Basic-Auth password).
    #[serde(default = "default_password_env")]
    pub password_env: String,
    /// Variable holding the shared secret used for redirect signatures.
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username_env: default_username_env(),
            password_env: default_password_env(),
            secret_env: default_secret_env(),
        }
    }
}

impl AuthConfig {
    /// Checks that every variable name is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] for an empty name, one that does
    /// not start with a letter or underscore, or one with other characters than
    /// ASCII alphanumerics and underscores.
    pub fn validate(&self) -> Result<()> {
        for name in [&self.username_env, &self.password_env, &self.secret_env] {
            validate_env_var_name(name)?;
        }
        Ok(())
    }
}

/// Gateway credentials.
///
/// The password and shared secret are redacted from `Debug` output.
#[derive(Debug)]
pub struct Credentials {
    /// API username.
    pub username: String,
    /// API token, sent as the Basic-Auth password.
    pub password: SecretString,
    /// Shared secret for redirect and tokenize signatures.
    pub secret: SecretString,
}

impl Credentials {
    /// Creates credentials from their parts.
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString, secret: SecretString) -> Self {
        Self { username: username.into(), password, secret }
    }

    /// Reads credentials from the environment variables named in `auth`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] naming the first variable that is
    /// unset, empty, or not valid unicode. The value itself is never included.
    pub fn from_env(auth: &AuthConfig) -> Result<Self> {
        Self::from_lookup(auth, |name| std::env::var(name).ok())
    }

    /// Resolves credentials through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(auth: &AuthConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let resolve = |name: &str| {
            lookup(name).filter(|value| !value.is_empty()).ok_or_else(|| {
                GatewayError::Configuration(format!("environment variable {name} is not set"))
            })
        };

        Ok(Self {
            username: resolve(auth.username_env.as_str())?,
            password: resolve(auth.password_env.as_str())?.into(),
            secret: resolve(auth.secret_env.as_str())?.into(),
        })
    }
}

/// Parses `host[:port]` the way request URIs are built and returns it in the
/// form the gateway host check compares against: lower-case host, port only
/// when it is not the `https` default.
pub(crate) fn canonical_host(host: &str) -> Result<String> {
    let invalid = |reason: &str| {
        GatewayError::Configuration(format!("invalid gateway host {host:?}: {reason}"))
    };

    if host.is_empty() {
        return Err(invalid("host cannot be empty"));
    }

    let url = Url::parse(&format!("https://{host}")).map_err(|e| invalid(&e.to_string()))?;

    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("userinfo is not allowed"));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("expected host[:port] only"));
    }

    let name = url.host_str().ok_or_else(|| invalid("missing host"))?;
    Ok(match url.port() {
        Some(port) => format!("{name}:{port}"),
        None => name.to_owned(),
    })
}

fn validate_env_var_name(name: &str) -> Result<()> {
    let Some(first_char) = name.chars().next() else {
        return Err(GatewayError::Configuration(
            "environment variable name cannot be empty".to_owned(),
        ));
    };

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(GatewayError::Configuration(format!(
            "environment variable name must start with letter or underscore: {name}"
        )));
    }

    if let Some(ch) = name.chars().find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(GatewayError::Configuration(format!(
            "environment variable name contains invalid character '{ch}': {name}"
        )));
    }

    Ok(())
}

fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.to_owned()
}

fn default_username_env() -> String {
    "FATZEBRA_USERNAME".to_owned()
}

fn default_password_env() -> String {
    "FATZEBRA_TOKEN".to_owned()
}

fn default_secret_env() -> String {
    "FATZEBRA_SHARED_SECRET".to_owned()
}
