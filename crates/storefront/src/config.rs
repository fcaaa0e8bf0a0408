//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MENU_CSV_URL` - Published CSV of the menu sheet
//! - `WHATSAPP_NUMBER` - Merchant's WhatsApp number (digits, country code first)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: `http://{host}:{port}`)
//! - `STORE_NAME` - Shown in the merchant message (default: Sakthi Kitchen)
//! - `ORDERS_WEBHOOK_URL` - Order log endpoint
//! - `ORDER_ID_MODE` - `local`, `gateway` or `server` (default: local)
//! - `STORE_UTC_OFFSET_MINUTES` - Store time zone (default: 330, IST)
//! - `MENU_POLL_INTERVAL_SECS` - Feed poll interval (default: 5)
//! - `MENU_FETCH_TIMEOUT_SECS` - Feed request timeout (default: 10)
//! - `ORDER_LOG_TIMEOUT_SECS` - Order log request timeout (default: 8)
//! - `MENU_LOOKAHEAD_DAYS` / `MENU_MAX_DAYS` - Schedule window (default: 7 / 5)
//! - `LUNCH_SLOT_START` / `LUNCH_LEAD_HOURS` - Lunch rule (default: 11:00 / 14)
//! - `SNACKS_SLOT_START` / `SNACKS_LEAD_HOURS` - Snacks rule (default: 16:00 / 12)
//! - `RAZORPAY_KEY_ID` / `RAZORPAY_KEY_SECRET` - Gateway credentials (both or neither)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `LOG_FORMAT` - `pretty` or `json` (default: pretty)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveTime, TimeDelta};
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use tiffin_core::calendar::{DEFAULT_UTC_OFFSET_MINUTES, StoreTimeZone};
use tiffin_core::cutoff::{CutoffPolicy, ScheduleWindow, SlotRule};
use tiffin_core::order::OrderIdMode;
use tiffin_core::types::MealCategory;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Store identity and order handling
    pub store: StoreConfig,
    /// Menu feed and schedule window
    pub menu: MenuConfig,
    /// Ordering cutoffs per category
    pub cutoffs: CutoffPolicy,
    /// Order log webhook, if configured
    pub order_log: Option<OrderLogConfig>,
    /// Razorpay credentials, if configured
    pub razorpay: Option<RazorpayConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Log output format
    pub log_format: LogFormat,
}

/// Store identity.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub name: String,
    /// Digits only.
    pub whatsapp_number: String,
    pub time_zone: StoreTimeZone,
    pub order_id_mode: OrderIdMode,
}

/// Menu feed settings.
#[derive(Debug, Clone)]
pub struct MenuConfig {
    pub csv_url: Url,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub window: ScheduleWindow,
}

/// Order log webhook settings.
#[derive(Debug, Clone)]
pub struct OrderLogConfig {
    pub webhook_url: Url,
    pub timeout: Duration,
}

/// Razorpay credentials.
///
/// Implements `Debug` manually to redact the key secret.
#[derive(Clone)]
pub struct RazorpayConfig {
    /// Public key ID (safe to expose to the browser)
    pub key_id: String,
    /// Key secret, used for basic auth and signature verification
    pub key_secret: SecretString,
    /// API base URL
    pub api_base: Url,
    /// Request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("api_base", &self.api_base.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Razorpay REST API base.
pub const RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1/";

impl StorefrontConfig {
    /// Configuration with every optional setting at its default.
    #[must_use]
    pub fn new(menu_csv_url: Url, whatsapp_number: &str) -> Self {
        let host = IpAddr::from([127, 0, 0, 1]);
        let port = 3000;
        Self {
            host,
            port,
            base_url: format!("http://{host}:{port}"),
            store: StoreConfig {
                name: "Sakthi Kitchen".to_string(),
                whatsapp_number: digits(whatsapp_number),
                time_zone: StoreTimeZone::default(),
                order_id_mode: OrderIdMode::Local,
            },
            menu: MenuConfig {
                csv_url: menu_csv_url,
                poll_interval: Duration::from_secs(5),
                fetch_timeout: Duration::from_secs(10),
                window: ScheduleWindow::default(),
            },
            cutoffs: CutoffPolicy::default(),
            order_log: None,
            razorpay: None,
            sentry_dsn: None,
            sentry_environment: None,
            log_format: LogFormat::Pretty,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the gateway secret fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let csv_url = parse_env::<Url>("MENU_CSV_URL", &get_required_env("MENU_CSV_URL")?)?;
        let whatsapp_number = digits(&get_required_env("WHATSAPP_NUMBER")?);
        if whatsapp_number.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "WHATSAPP_NUMBER".to_string(),
                "must contain digits".to_string(),
            ));
        }

        let host = parse_env::<IpAddr>(
            "STOREFRONT_HOST",
            &get_env_or_default("STOREFRONT_HOST", "127.0.0.1"),
        )?;
        let port = parse_env::<u16>(
            "STOREFRONT_PORT",
            &get_env_or_default("STOREFRONT_PORT", "3000"),
        )?;
        let base_url = get_optional_env("STOREFRONT_BASE_URL")
            .unwrap_or_else(|| format!("http://{host}:{port}"));

        let offset_minutes = parse_env::<i32>(
            "STORE_UTC_OFFSET_MINUTES",
            &get_env_or_default(
                "STORE_UTC_OFFSET_MINUTES",
                &DEFAULT_UTC_OFFSET_MINUTES.to_string(),
            ),
        )?;
        let time_zone = StoreTimeZone::from_offset_minutes(offset_minutes).ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "STORE_UTC_OFFSET_MINUTES".to_string(),
                format!("{offset_minutes} is out of range"),
            )
        })?;

        let store = StoreConfig {
            name: get_env_or_default("STORE_NAME", "Sakthi Kitchen"),
            whatsapp_number,
            time_zone,
            order_id_mode: parse_order_id_mode(&get_env_or_default("ORDER_ID_MODE", "local"))?,
        };

        let menu = MenuConfig {
            csv_url,
            poll_interval: get_secs("MENU_POLL_INTERVAL_SECS", 5)?,
            fetch_timeout: get_secs("MENU_FETCH_TIMEOUT_SECS", 10)?,
            window: ScheduleWindow {
                lookahead_days: parse_env("MENU_LOOKAHEAD_DAYS", &get_env_or_default("MENU_LOOKAHEAD_DAYS", "7"))?,
                max_days: parse_env("MENU_MAX_DAYS", &get_env_or_default("MENU_MAX_DAYS", "5"))?,
            },
        };

        let cutoffs = CutoffPolicy::new(time_zone)
            .with_rule(
                MealCategory::Lunch,
                slot_rule_from_env("LUNCH_SLOT_START", "11:00", "LUNCH_LEAD_HOURS", 14, 2)?,
            )
            .with_rule(
                MealCategory::Snacks,
                slot_rule_from_env("SNACKS_SLOT_START", "16:00", "SNACKS_LEAD_HOURS", 12, 1)?,
            );

        let order_log = match get_optional_env("ORDERS_WEBHOOK_URL") {
            Some(raw) => Some(OrderLogConfig {
                webhook_url: parse_env("ORDERS_WEBHOOK_URL", &raw)?,
                timeout: get_secs("ORDER_LOG_TIMEOUT_SECS", 8)?,
            }),
            None => None,
        };

        Ok(Self {
            host,
            port,
            base_url,
            store,
            menu,
            cutoffs,
            order_log,
            razorpay: RazorpayConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            log_format: match get_optional_env("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl RazorpayConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (
            get_optional_env("RAZORPAY_KEY_ID"),
            get_optional_env("RAZORPAY_KEY_SECRET"),
        ) {
            (None, None) => Ok(None),
            (Some(key_id), Some(secret)) => {
                validate_secret_strength(&secret, "RAZORPAY_KEY_SECRET")?;
                Ok(Some(Self {
                    key_id,
                    key_secret: SecretString::from(secret),
                    api_base: parse_env(
                        "RAZORPAY_API_BASE",
                        &get_env_or_default("RAZORPAY_API_BASE", RAZORPAY_API_BASE),
                    )?,
                    timeout: Duration::from_secs(15),
                }))
            }
            (Some(_), None) => Err(ConfigError::MissingEnvVar("RAZORPAY_KEY_SECRET".to_string())),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("RAZORPAY_KEY_ID".to_string())),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Blank counts as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn get_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    let secs = parse_env::<u64>(key, &get_env_or_default(key, &default.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_order_id_mode(raw: &str) -> Result<OrderIdMode, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "local" => Ok(OrderIdMode::Local),
        "gateway" => Ok(OrderIdMode::Gateway),
        "server" => Ok(OrderIdMode::Server),
        other => Err(ConfigError::InvalidEnvVar(
            "ORDER_ID_MODE".to_string(),
            format!("unknown mode '{other}' (expected local, gateway or server)"),
        )),
    }
}

/// Build a slot rule whose label spans `slot_hours` from the start time.
fn slot_rule_from_env(
    start_key: &str,
    default_start: &str,
    lead_key: &str,
    default_lead: u32,
    slot_hours: i64,
) -> Result<SlotRule, ConfigError> {
    let raw = get_env_or_default(start_key, default_start);
    let start = NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|e| ConfigError::InvalidEnvVar(start_key.to_string(), e.to_string()))?;
    let lead_hours = parse_env::<u32>(lead_key, &get_env_or_default(lead_key, &default_lead.to_string()))?;
    Ok(slot_rule(start, lead_hours, slot_hours))
}

fn slot_rule(start: NaiveTime, lead_hours: u32, slot_hours: i64) -> SlotRule {
    let (end, _) = start.overflowing_add_signed(TimeDelta::hours(slot_hours));
    let label = format!("{} - {}", start.format("%I:%M %p"), end.format("%I:%M %p"));
    SlotRule::new(start, lead_hours, label)
}

/// Keep only ASCII digits.
fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-razorpay-key", "TEST_VAR"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR").is_err());
        assert!(validate_secret_strength("Qw8rT2zL9pX4mN7vB1cK6jH3", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_order_id_mode_parsing() {
        assert_eq!(parse_order_id_mode("Gateway").unwrap(), OrderIdMode::Gateway);
        assert_eq!(parse_order_id_mode(" server ").unwrap(), OrderIdMode::Server);
        assert!(matches!(
            parse_order_id_mode("random"),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "ORDER_ID_MODE"
        ));
    }

    #[test]
    fn test_slot_rule_labels_match_defaults() {
        let lunch = slot_rule(NaiveTime::from_hms_opt(11, 0, 0).unwrap(), 14, 2);
        assert_eq!(lunch, SlotRule::lunch());
        let snacks = slot_rule(NaiveTime::from_hms_opt(16, 0, 0).unwrap(), 12, 1);
        assert_eq!(snacks, SlotRule::snacks());
    }

    #[test]
    fn test_digits() {
        assert_eq!(digits("+91 98400-12345"), "919840012345");
    }

    #[test]
    fn test_new_defaults() {
        let config = StorefrontConfig::new(
            Url::parse("https://sheets.example.com/menu.csv").unwrap(),
            "+91 98400 12345",
        );
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.store.whatsapp_number, "919840012345");
        assert_eq!(config.menu.poll_interval, Duration::from_secs(5));
        assert_eq!(config.cutoffs, CutoffPolicy::default());
        assert!(!config.is_secure());
    }

    #[test]
    fn test_razorpay_config_debug_redacts_secret() {
        let config = RazorpayConfig {
            key_id: "rzp_test_public".to_string(),
            key_secret: SecretString::from("super_hidden_value"),
            api_base: Url::parse(RAZORPAY_API_BASE).unwrap(),
            timeout: Duration::from_secs(15),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("rzp_test_public"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_hidden_value"));
    }
}
