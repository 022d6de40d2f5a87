//! Offline configuration check.
//!
//! Reports whether the configuration file parses and whether the credential
//! variables it names are set, without contacting the gateway. Values of
//! secrets are never printed.

use std::path::Path;

use fatzebra::{Credentials, GatewayConfig};
use serde_json::json;

/// Status of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed.
    Fail,
}

impl CheckStatus {
    /// Returns string representation for JSON serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

/// Individual check result.
#[derive(Debug, Clone)]
pub struct Check {
    /// Check name.
    pub name: &'static str,
    /// Check status.
    pub status: CheckStatus,
    /// Details.
    pub message: String,
}

impl Check {
    fn pass(name: &'static str, message: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, message: message.into() }
    }

    fn fail(name: &'static str, message: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, message: message.into() }
    }
}

/// Result of all checks.
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// Individual checks, in the order they ran.
    pub checks: Vec<Check>,
}

impl CheckReport {
    /// Checks the configuration file at `path`, resolving credentials through `lookup`.
    pub fn run(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut checks = Vec::new();

        let Some(path) = path else {
            checks.push(Check::fail("config", "no configuration file given"));
            return Self { checks };
        };

        let config = match std::fs::read_to_string(path) {
            Ok(text) => GatewayConfig::from_toml(&text),
            Err(e) => {
                checks.push(Check::fail("config", format!("cannot read {}: {e}", path.display())));
                return Self { checks };
            }
        };

        let config = match config {
            Ok(config) => config,
            Err(e) => {
                checks.push(Check::fail("config", e.to_string()));
                return Self { checks };
            }
        };

        checks.push(Check::pass(
            "config",
            format!("host {}, maximum {}", config.gateway_host(), config.max_amount()),
        ));

        checks.push(match Credentials::from_lookup(&config.auth, lookup) {
            Ok(credentials) => {
                Check::pass("credentials", format!("username {}", credentials.username))
            }
            Err(e) => Check::fail("credentials", e.to_string()),
        });

        Self { checks }
    }

    /// Returns `true` if every check passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.status == CheckStatus::Pass)
    }

    /// Serializes the report to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns error if JSON serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let json = json!({
            "status": if self.passed() { "ok" } else { "failed" },
            "checks": self.checks.iter().map(|c| json!({
                "name": c.name,
                "status": c.status.as_str(),
                "message": c.message,
            })).collect::<Vec<_>>(),
        });

        serde_json::to_string_pretty(&json)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn config_file(toml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();
        file
    }

    fn all_set(name: &str) -> Option<String> {
        Some(format!("value-of-{name}"))
    }

    #[test]
    fn test_missing_path_fails() {
        let report = CheckReport::run(None, all_set);
        assert!(!report.passed());
        assert_eq!(report.checks[0].name, "config");
    }

    #[test]
    fn test_valid_config_and_credentials() {
        let file = config_file("max_amount_cents = 150000\n");
        let report = CheckReport::run(Some(file.path()), all_set);

        assert!(report.passed());
        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.checks[0].message, "host gateway.sandbox.fatzebra.com.au, maximum $1500.00");
    }

    #[test]
    fn test_invalid_config() {
        let file = config_file("max_amount_cents = 0\n");
        let report = CheckReport::run(Some(file.path()), all_set);

        assert!(!report.passed());
        assert!(report.checks[0].message.contains("maximum amount"));
    }

    #[test]
    fn test_missing_credentials_are_named_not_shown() {
        let file = config_file("max_amount_cents = 100\n");
        let report = CheckReport::run(Some(file.path()), |name| {
            (name != "FATZEBRA_SHARED_SECRET").then(|| "hunter2".to_owned())
        });

        assert!(!report.passed());
        let json = report.to_json().unwrap();
        assert!(json.contains("FATZEBRA_SHARED_SECRET"));
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"status\": \"failed\""));
    }
}
