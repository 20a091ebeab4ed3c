//! Server configuration
//!
//! Everything is read once from the environment at startup and then shared
//! read-only through [`crate::state::AppState`].

use std::time::Duration;

use crate::availability::{AdmissionMode, CapacityTable, DEFAULT_MAX_PER_SLOT, UnknownSlotPolicy};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration
///
/// | Variable | Default |
/// |----------|---------|
/// | ENVIRONMENT | development |
/// | HTTP_PORT | 3000 |
/// | FRONTEND_URL | http://localhost:5500 |
/// | CORS_ALLOWED_ORIGINS | (permissive) |
/// | BOOKING_STORE | airtable |
/// | SLOT_CAPACITIES | built-in table |
/// | DEFAULT_SLOT_CAPACITY | 1000 |
/// | UNKNOWN_SLOT_POLICY | admit |
/// | ADMISSION_MODE | legacy |
/// | RESERVATION_TTL_SECS | 1800 |
/// | UPSTREAM_TIMEOUT_SECS | 30 |
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    pub http_port: u16,
    /// Allowed CORS origins; `None` means any origin
    pub cors_allowed_origins: Option<Vec<String>>,
    /// Timeout applied to every outbound request
    pub upstream_timeout: Duration,
    pub stripe: StripeConfig,
    pub booking_store: BookingStoreConfig,
    /// Zapier catch hook; forwarding is disabled when unset
    pub zapier_webhook_url: Option<String>,
    pub capacity: CapacityTable,
    pub unknown_slot_policy: UnknownSlotPolicy,
    pub admission_mode: AdmissionMode,
    /// Lifetime of an unpaid reservation (reserve mode only)
    pub reservation_ttl: Duration,
    pub log: LogConfig,
}

/// Stripe Checkout settings
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    /// ISO currency code, lowercase
    pub currency: String,
    /// Redirect after payment (may contain `{CHECKOUT_SESSION_ID}`)
    pub success_url: String,
    pub cancel_url: String,
}

/// Which booking store backs the availability check
#[derive(Debug, Clone)]
pub enum BookingStoreConfig {
    Airtable(AirtableConfig),
    /// Process-local store, lost on restart
    Memory,
}

#[derive(Debug, Clone)]
pub struct AirtableConfig {
    pub api_key: String,
    pub base_id: String,
    pub table_name: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Fallback level when `RUST_LOG` is not set
    pub level: String,
    pub json: bool,
    /// Directory for daily rolling log files
    pub dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_vars<F>(var: F) -> Result<Self, BoxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".into());
        let frontend_url = var("FRONTEND_URL")
            .unwrap_or_else(|| "http://localhost:5500".into())
            .trim_end_matches('/')
            .to_string();

        let stripe = StripeConfig {
            secret_key: require_secret(&var, "STRIPE_SECRET_KEY", &environment)?,
            webhook_secret: require_secret(&var, "STRIPE_WEBHOOK_SECRET", &environment)?,
            api_base: var("STRIPE_API_BASE").unwrap_or_else(|| "https://api.stripe.com".into()),
            currency: var("CHECKOUT_CURRENCY")
                .unwrap_or_else(|| "eur".into())
                .to_lowercase(),
            success_url: var("CHECKOUT_SUCCESS_URL").unwrap_or_else(|| {
                format!("{frontend_url}/success.html?session_id={{CHECKOUT_SESSION_ID}}")
            }),
            cancel_url: var("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|| format!("{frontend_url}/cancel.html")),
        };

        let booking_store = match var("BOOKING_STORE").as_deref().unwrap_or("airtable") {
            "airtable" => BookingStoreConfig::Airtable(AirtableConfig {
                api_key: require_secret(&var, "AIRTABLE_API_KEY", &environment)?,
                base_id: var("AIRTABLE_BASE_ID")
                    .filter(|s| !s.is_empty())
                    .ok_or("AIRTABLE_BASE_ID must be set when BOOKING_STORE=airtable")?,
                table_name: var("AIRTABLE_TABLE_NAME").unwrap_or_else(|| "Orders".into()),
                api_base: var("AIRTABLE_API_BASE")
                    .unwrap_or_else(|| "https://api.airtable.com".into()),
            }),
            "memory" => BookingStoreConfig::Memory,
            other => return Err(format!("Unknown BOOKING_STORE: {other}").into()),
        };

        let default_max = var("DEFAULT_SLOT_CAPACITY")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_PER_SLOT);
        let capacity = match var("SLOT_CAPACITIES").filter(|s| !s.trim().is_empty()) {
            Some(table) => CapacityTable::parse(&table, default_max)?,
            None => CapacityTable::standard(default_max),
        };

        Ok(Self {
            environment,
            http_port: var("HTTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|origins| !origins.is_empty()),
            upstream_timeout: Duration::from_secs(
                var("UPSTREAM_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            stripe,
            booking_store,
            zapier_webhook_url: var("ZAPIER_WEBHOOK_URL").filter(|s| !s.is_empty()),
            capacity,
            unknown_slot_policy: var("UNKNOWN_SLOT_POLICY")
                .map(|v| v.parse::<UnknownSlotPolicy>())
                .transpose()?
                .unwrap_or_default(),
            admission_mode: var("ADMISSION_MODE")
                .map(|v| v.parse::<AdmissionMode>())
                .transpose()?
                .unwrap_or_default(),
            reservation_ttl: Duration::from_secs(
                var("RESERVATION_TTL_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1800),
            ),
            log: LogConfig {
                level: var("LOG_LEVEL").unwrap_or_else(|| "info".into()),
                json: var("LOG_JSON")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(false),
                dir: var("LOG_DIR").filter(|s| !s.is_empty()),
            },
        })
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Require a secret env var: must be set and non-empty in non-development environments.
fn require_secret<F>(var: &F, name: &str, environment: &str) -> Result<String, BoxError>
where
    F: Fn(&str) -> Option<String>,
{
    let val = match var(name) {
        Some(v) => v,
        None => {
            if environment != "development" {
                return Err(format!("{name} must be set in {environment} environment").into());
            }
            format!("dev-{name}-not-for-production")
        }
    };
    if val.is_empty() && environment != "development" {
        return Err(format!("{name} must not be empty in {environment} environment").into());
    }
    Ok(val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, BoxError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_development_defaults() {
        let config = load(&[("BOOKING_STORE", "memory")]).unwrap();
        assert_eq!(config.environment, "development");
        assert!(!config.is_production());
        assert_eq!(config.http_port, 3000);
        assert!(config.cors_allowed_origins.is_none());
        assert!(matches!(config.booking_store, BookingStoreConfig::Memory));
        assert_eq!(config.unknown_slot_policy, UnknownSlotPolicy::Admit);
        assert_eq!(config.admission_mode, AdmissionMode::Legacy);
        assert_eq!(config.reservation_ttl, Duration::from_secs(1800));
        assert_eq!(config.stripe.currency, "eur");
        assert_eq!(
            config.stripe.success_url,
            "http://localhost:5500/success.html?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(config.stripe.cancel_url, "http://localhost:5500/cancel.html");
        assert_eq!(config.capacity.max_allowed("9.00"), 20);
        assert_eq!(config.capacity.max_allowed("10.00"), 40);
        assert_eq!(config.capacity.max_allowed("14.00"), 1000);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("BOOKING_STORE", "memory"),
            ("HTTP_PORT", "8080"),
            ("FRONTEND_URL", "https://shop.example/"),
            ("CORS_ALLOWED_ORIGINS", "https://shop.example, https://admin.example"),
            ("SLOT_CAPACITIES", "9.00=50, 9.30=30"),
            ("DEFAULT_SLOT_CAPACITY", "5"),
            ("UNKNOWN_SLOT_POLICY", "reject"),
            ("ADMISSION_MODE", "reserve"),
            ("CHECKOUT_CURRENCY", "EUR"),
        ])
        .unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.stripe.cancel_url, "https://shop.example/cancel.html");
        assert_eq!(
            config.cors_allowed_origins.unwrap(),
            vec!["https://shop.example", "https://admin.example"]
        );
        assert_eq!(config.capacity.max_allowed("9.00"), 50);
        assert_eq!(config.capacity.max_allowed("10.00"), 5);
        assert_eq!(config.unknown_slot_policy, UnknownSlotPolicy::Reject);
        assert_eq!(config.admission_mode, AdmissionMode::Reserve);
        assert_eq!(config.stripe.currency, "eur");
    }

    #[test]
    fn test_airtable_store() {
        let config = load(&[
            ("AIRTABLE_API_KEY", "pat123"),
            ("AIRTABLE_BASE_ID", "appXYZ"),
        ])
        .unwrap();
        match config.booking_store {
            BookingStoreConfig::Airtable(airtable) => {
                assert_eq!(airtable.api_key, "pat123");
                assert_eq!(airtable.base_id, "appXYZ");
                assert_eq!(airtable.table_name, "Orders");
                assert_eq!(airtable.api_base, "https://api.airtable.com");
            }
            BookingStoreConfig::Memory => panic!("expected airtable store"),
        }
    }

    #[test]
    fn test_airtable_requires_base_id() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("AIRTABLE_BASE_ID"));
    }

    #[test]
    fn test_production_requires_secrets() {
        let err = load(&[("ENVIRONMENT", "production"), ("BOOKING_STORE", "memory")])
            .unwrap_err();
        assert!(err.to_string().contains("STRIPE_SECRET_KEY"));

        let err = load(&[
            ("ENVIRONMENT", "production"),
            ("BOOKING_STORE", "memory"),
            ("STRIPE_SECRET_KEY", ""),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(load(&[("BOOKING_STORE", "postgres")]).is_err());
        assert!(load(&[("BOOKING_STORE", "memory"), ("ADMISSION_MODE", "optimistic")]).is_err());
        assert!(load(&[("BOOKING_STORE", "memory"), ("SLOT_CAPACITIES", "9.00:20")]).is_err());
    }
}
