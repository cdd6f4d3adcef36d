//! Application configuration loaded from environment variables.

use std::str::FromStr;

use chrono::Duration;
use commit::{CommitSettings, DEFAULT_CHARGE_DESCRIPTION_SUFFIX};
use domain::{FeeSchedule, StateExpirations};

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL connection string; the in-memory store is
///   used when unset
/// - `CHARGE_DESCRIPTION_SUFFIX`: appended to every charge description
/// - `PENDING_EXPIRATION_HOURS`, `SUBMITTED_EXPIRATION_HOURS`,
///   `APPROVED_EXPIRATION_HOURS`: per-state expiry windows
/// - `TRANSACTION_FEE_BPS`, `TRANSACTION_FEE_FIXED_CENTS`: processing fee
/// - `SANDBOX_FIXTURES`: path to a JSON file of artworks, cards, partners,
///   merchant accounts and stock loaded into the sandbox at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub charge_description_suffix: String,
    pub pending_expiration_hours: i64,
    pub submitted_expiration_hours: i64,
    pub approved_expiration_hours: i64,
    pub transaction_fee_bps: i64,
    pub transaction_fee_fixed_cents: i64,
    pub sandbox_fixtures: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| ParsedVar(lookup(key));

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            charge_description_suffix: lookup("CHARGE_DESCRIPTION_SUFFIX")
                .unwrap_or(defaults.charge_description_suffix),
            pending_expiration_hours: parsed("PENDING_EXPIRATION_HOURS")
                .unwrap_or(defaults.pending_expiration_hours),
            submitted_expiration_hours: parsed("SUBMITTED_EXPIRATION_HOURS")
                .unwrap_or(defaults.submitted_expiration_hours),
            approved_expiration_hours: parsed("APPROVED_EXPIRATION_HOURS")
                .unwrap_or(defaults.approved_expiration_hours),
            transaction_fee_bps: parsed("TRANSACTION_FEE_BPS")
                .unwrap_or(defaults.transaction_fee_bps),
            transaction_fee_fixed_cents: parsed("TRANSACTION_FEE_FIXED_CENTS")
                .unwrap_or(defaults.transaction_fee_fixed_cents),
            sandbox_fixtures: lookup("SANDBOX_FIXTURES").filter(|path| !path.is_empty()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the settings shared by the coordinator, lifecycle and reconciler.
    pub fn commit_settings(&self) -> CommitSettings {
        CommitSettings {
            charge_description_suffix: self.charge_description_suffix.clone(),
            fees: FeeSchedule {
                transaction_fee_bps: self.transaction_fee_bps,
                transaction_fee_fixed_cents: self.transaction_fee_fixed_cents,
            },
            expirations: StateExpirations {
                pending: Duration::hours(self.pending_expiration_hours),
                submitted: Duration::hours(self.submitted_expiration_hours),
                approved: Duration::hours(self.approved_expiration_hours),
            },
        }
    }
}

/// A raw variable that parses into whatever type its field needs.
struct ParsedVar(Option<String>);

impl ParsedVar {
    fn unwrap_or<T: FromStr>(self, default: T) -> T {
        self.0
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }
}

impl Default for Config {
    fn default() -> Self {
        let fees = FeeSchedule::default();
        let expirations = StateExpirations::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            charge_description_suffix: DEFAULT_CHARGE_DESCRIPTION_SUFFIX.to_string(),
            pending_expiration_hours: expirations.pending.num_hours(),
            submitted_expiration_hours: expirations.submitted.num_hours(),
            approved_expiration_hours: expirations.approved.num_hours(),
            transaction_fee_bps: fees.transaction_fee_bps,
            transaction_fee_fixed_cents: fees.transaction_fee_fixed_cents,
            sandbox_fixtures: None,
        }
    }
}
