use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

use signage_feeds::Endpoints;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    File(PathBuf),
    Inline(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Google {
        spreadsheet_id: String,
        key: KeySource,
        api_base: Option<String>,
    },
    /// In-process sheet for local development; nothing is persisted.
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub backend: Backend,
    pub cache_ttl: Duration,
    pub news_rotation_secs: u64,
    pub session_days: i64,
    pub endpoints: Endpoints,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or_default = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let jwt_secret = var("SIGNAGE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SIGNAGE_JWT_SECRET is unset or still a placeholder");
        }

        let backend = match or_default("SIGNAGE_BACKEND", "google").to_lowercase().as_str() {
            "memory" => Backend::Memory,
            "google" => {
                let spreadsheet_id = var("SIGNAGE_SPREADSHEET_ID")
                    .context("SIGNAGE_SPREADSHEET_ID is required for the google backend")?;
                let key = match (
                    var("SIGNAGE_SERVICE_ACCOUNT_FILE"),
                    lookup("SIGNAGE_SERVICE_ACCOUNT_JSON").filter(|v| !v.trim().is_empty()),
                ) {
                    (Some(path), _) => KeySource::File(path.into()),
                    (None, Some(json)) => KeySource::Inline(json),
                    (None, None) => bail!(
                        "set SIGNAGE_SERVICE_ACCOUNT_FILE or SIGNAGE_SERVICE_ACCOUNT_JSON"
                    ),
                };
                Backend::Google {
                    spreadsheet_id,
                    key,
                    api_base: var("SIGNAGE_SHEETS_API_BASE"),
                }
            }
            other => bail!("unknown SIGNAGE_BACKEND {other:?} (expected google or memory)"),
        };

        let mut endpoints = Endpoints::default();
        if let Some(v) = var("SIGNAGE_GEOCODING_URL") {
            endpoints.geocoding = v;
        }
        if let Some(v) = var("SIGNAGE_FORECAST_URL") {
            endpoints.forecast = v;
        }
        if let Some(v) = var("SIGNAGE_EXCHANGE_URL") {
            endpoints.exchange = v;
        }
        if let Some(v) = var("SIGNAGE_CRYPTO_URL") {
            endpoints.crypto = v;
        }

        Ok(Self {
            host: or_default("SIGNAGE_HOST", "0.0.0.0"),
            port: or_default("SIGNAGE_PORT", "8080")
                .parse()
                .context("SIGNAGE_PORT")?,
            jwt_secret,
            backend,
            cache_ttl: Duration::from_secs(
                or_default("SIGNAGE_CACHE_TTL_SECS", "90")
                    .parse()
                    .context("SIGNAGE_CACHE_TTL_SECS")?,
            ),
            news_rotation_secs: or_default("SIGNAGE_NEWS_ROTATION_SECONDS", "10")
                .parse()
                .context("SIGNAGE_NEWS_ROTATION_SECONDS")?,
            session_days: or_default("SIGNAGE_SESSION_DAYS", "7")
                .parse()
                .context("SIGNAGE_SESSION_DAYS")?,
            endpoints,
        })
    }
}
