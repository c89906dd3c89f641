//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use common::CustomerId;
use domain::{Money, PricingPolicy};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
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
/// - `DATABASE_URL`: PostgreSQL URL; the in-memory store is used when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `TAX_RATE_BPS`: tax rate in basis points (default: `800`)
/// - `FREE_SHIPPING_THRESHOLD_CENTS`: free shipping from this subtotal (default: `5000`)
/// - `SHIPPING_COST_CENTS`: flat shipping below the threshold (default: `999`)
/// - `REQUEST_TIMEOUT_MS`: order placement deadline (default: `10000`)
/// - `AUTH_TOKENS`: `token=customer-uuid` pairs separated by commas
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub tax_rate_bps: u32,
    pub free_shipping_threshold_cents: i64,
    pub shipping_cost_cents: i64,
    pub request_timeout: Duration,
    pub auth_tokens: Vec<(String, CustomerId)>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .and_then(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            tax_rate_bps: parse_var(&lookup, "TAX_RATE_BPS").unwrap_or(defaults.tax_rate_bps),
            free_shipping_threshold_cents: parse_var(&lookup, "FREE_SHIPPING_THRESHOLD_CENTS")
                .unwrap_or(defaults.free_shipping_threshold_cents),
            shipping_cost_cents: parse_var(&lookup, "SHIPPING_COST_CENTS")
                .unwrap_or(defaults.shipping_cost_cents),
            request_timeout: parse_var(&lookup, "REQUEST_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            auth_tokens: lookup("AUTH_TOKENS")
                .map(|v| parse_auth_tokens(&v))
                .unwrap_or_default(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the pricing policy described by this configuration.
    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            tax_rate_bps: self.tax_rate_bps,
            free_shipping_threshold: Money::from_cents(self.free_shipping_threshold_cents),
            shipping_cost: Money::from_cents(self.shipping_cost_cents),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let pricing = PricingPolicy::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            tax_rate_bps: pricing.tax_rate_bps,
            free_shipping_threshold_cents: pricing.free_shipping_threshold.cents(),
            shipping_cost_cents: pricing.shipping_cost.cents(),
            request_timeout: Duration::from_millis(10_000),
            auth_tokens: Vec::new(),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

/// Parses `token=uuid,token=uuid`. Malformed pairs are skipped.
fn parse_auth_tokens(raw: &str) -> Vec<(String, CustomerId)> {
    raw.split(',')
        .filter_map(|pair| {
            let (token, customer) = pair.split_once('=')?;
            let token = token.trim();
            if token.is_empty() {
                return None;
            }
            let customer = customer.trim().parse().ok()?;
            Some((token.to_string(), customer))
        })
        .collect()
}
