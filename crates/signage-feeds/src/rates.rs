use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use signage_types::api::Rates;

use crate::client::FeedClient;
use crate::error::{FeedError, Result};

const RATES_KEY: &str = "rates";

#[derive(Debug, Deserialize)]
struct LatestRates {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

type PriceTable = HashMap<String, HashMap<String, f64>>;

impl FeedClient {
    /// Price of one unit of `base` in BRL.
    pub async fn brl_rate(&self, base: &str) -> Result<f64> {
        let url = format!("{}/latest", self.endpoints.exchange);
        let resp: LatestRates = self
            .get_json(&url, &[("base", base), ("symbols", "BRL")])
            .await?;
        resp.rates
            .get("BRL")
            .copied()
            .ok_or(FeedError::Missing("rates.BRL"))
    }

    /// Bitcoin and ether prices in BRL.
    pub async fn crypto_prices(&self) -> Result<(Option<f64>, Option<f64>)> {
        let url = format!("{}/api/v3/simple/price", self.endpoints.crypto);
        let prices: PriceTable = self
            .get_json(&url, &[("ids", "bitcoin,ethereum"), ("vs_currencies", "brl")])
            .await?;
        let brl = |id: &str| prices.get(id).and_then(|p| p.get("brl")).copied();
        Ok((brl("bitcoin"), brl("ethereum")))
    }

    /// All rates, cached. Each source is queried independently; a failing
    /// source leaves its fields empty.
    pub async fn rates(&self) -> Rates {
        if let Some(hit) = self.rates_cache.get(RATES_KEY) {
            return hit;
        }

        let mut rates = Rates::default();
        match self.brl_rate("USD").await {
            Ok(v) => rates.usd = Some(v),
            Err(e) => debug!("USD rate unavailable: {}", e),
        }
        match self.brl_rate("EUR").await {
            Ok(v) => rates.eur = Some(v),
            Err(e) => debug!("EUR rate unavailable: {}", e),
        }
        match self.crypto_prices().await {
            Ok((btc, eth)) => {
                rates.btc = btc;
                rates.eth = eth;
            }
            Err(e) => debug!("Crypto prices unavailable: {}", e),
        }

        self.rates_cache.put(RATES_KEY, rates.clone());
        rates
    }
}
