use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use signage_types::api::{Rates, WeatherReport};

use crate::error::{FeedError, Result};
use crate::memo::TtlMemo;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const WEATHER_TTL: Duration = Duration::from_secs(15 * 60);
pub const RATES_TTL: Duration = Duration::from_secs(5 * 60);

/// Base URLs of the public APIs the display pulls from.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub geocoding: String,
    pub forecast: String,
    pub exchange: String,
    pub crypto: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocoding: "https://geocoding-api.open-meteo.com".into(),
            forecast: "https://api.open-meteo.com".into(),
            exchange: "https://api.exchangerate.host".into(),
            crypto: "https://api.coingecko.com".into(),
        }
    }
}

impl Endpoints {
    /// Every endpoint pointed at one base URL; used against local stubs.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            geocoding: base.clone(),
            forecast: base.clone(),
            exchange: base.clone(),
            crypto: base,
        }
    }
}

/// HTTP client for weather, geocoding and price lookups.
///
/// Lookups are optional enrichment: callers get partial results and the
/// failures only show up in debug logs.
pub struct FeedClient {
    pub(crate) http: Client,
    pub(crate) endpoints: Endpoints,
    pub(crate) weather_cache: TtlMemo<Vec<WeatherReport>>,
    pub(crate) rates_cache: TtlMemo<Rates>,
}

impl FeedClient {
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoints,
            weather_cache: TtlMemo::new(WEATHER_TTL),
            rates_cache: TtlMemo::new(RATES_TTL),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Forget cached weather and rates.
    pub fn clear_cache(&self) {
        self.weather_cache.clear();
        self.rates_cache.clear();
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!("GET {} {:?}", url, query);
        let resp = self.http.get(url).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.json().await?)
    }
}
