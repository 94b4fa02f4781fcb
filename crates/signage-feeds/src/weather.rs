use serde::Deserialize;
use tracing::debug;

use signage_types::api::WeatherReport;
use signage_types::models::WeatherUnit;

use crate::client::FeedClient;
use crate::error::{FeedError, Result};

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeMatch>,
}

#[derive(Debug, Deserialize)]
struct GeocodeMatch {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeather>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct CurrentWeather {
    pub temperature: Option<f64>,
    pub windspeed: Option<f64>,
    pub weathercode: Option<i64>,
}

/// Icon for a WMO weather code.
pub fn weather_emoji(code: Option<i64>) -> &'static str {
    match code {
        Some(0) => "☀️",
        Some(1..=3) => "⛅",
        Some(45 | 48) => "🌫️",
        Some(51 | 53 | 55 | 61 | 63 | 65 | 80 | 81 | 82) => "🌧️",
        Some(71 | 73 | 75 | 85 | 86) => "❄️",
        Some(95 | 96 | 99) => "⛈️",
        _ => "🌡️",
    }
}

impl FeedClient {
    /// Best coordinate match for a place name, if any.
    pub async fn geocode(&self, name: &str) -> Result<Option<(f64, f64)>> {
        let url = format!("{}/v1/search", self.endpoints.geocoding);
        let resp: GeocodeResponse = self
            .get_json(&url, &[("name", name), ("count", "1"), ("language", "pt")])
            .await?;
        Ok(resp
            .results
            .into_iter()
            .next()
            .map(|m| (m.latitude, m.longitude)))
    }

    pub async fn current_weather(&self, latitude: f64, longitude: f64) -> Result<CurrentWeather> {
        let url = format!("{}/v1/forecast", self.endpoints.forecast);
        let (lat, lon) = (latitude.to_string(), longitude.to_string());
        let resp: ForecastResponse = self
            .get_json(
                &url,
                &[
                    ("latitude", lat.as_str()),
                    ("longitude", lon.as_str()),
                    ("current_weather", "true"),
                    ("timezone", "America/Sao_Paulo"),
                ],
            )
            .await?;
        resp.current_weather
            .ok_or(FeedError::Missing("current_weather"))
    }

    /// Report for one unit, geocoding its city when coordinates are missing.
    /// `None` when no coordinates can be found.
    pub async fn weather_report(&self, unit: &WeatherUnit) -> Result<Option<WeatherReport>> {
        let coords = match unit.coordinates() {
            Some(c) => Some(c),
            None if !unit.city.trim().is_empty() => self.geocode(unit.city.trim()).await?,
            None => None,
        };
        let Some((lat, lon)) = coords else {
            return Ok(None);
        };

        let cur = self.current_weather(lat, lon).await?;
        Ok(Some(WeatherReport {
            alias: unit.display_name(),
            temperature: cur.temperature,
            windspeed: cur.windspeed,
            weathercode: cur.weathercode,
            icon: weather_emoji(cur.weathercode).to_string(),
        }))
    }

    /// Reports for every active unit, cached. Units whose lookups fail are
    /// left out.
    pub async fn weather(&self, units: &[WeatherUnit]) -> Vec<WeatherReport> {
        let active: Vec<&WeatherUnit> = units.iter().filter(|u| u.active).collect();
        if active.is_empty() {
            return Vec::new();
        }

        let key = cache_key(&active);
        if let Some(hit) = self.weather_cache.get(&key) {
            return hit;
        }

        let mut reports = Vec::with_capacity(active.len());
        for unit in active {
            match self.weather_report(unit).await {
                Ok(Some(r)) => reports.push(r),
                Ok(None) => debug!("No coordinates for weather unit {}", unit.display_name()),
                Err(e) => debug!("Weather lookup for {} failed: {}", unit.display_name(), e),
            }
        }
        self.weather_cache.put(key, reports.clone());
        reports
    }
}

fn cache_key(units: &[&WeatherUnit]) -> String {
    units
        .iter()
        .map(|u| format!("{}|{}|{}|{:?}|{:?}", u.id, u.alias, u.city, u.latitude, u.longitude))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Endpoints;
    use crate::stub;
    use axum::Json;
    use axum::Router;
    use axum::extract::Query;
    use axum::routing::get;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    fn unit(alias: &str, city: &str, coords: Option<(f64, f64)>, active: bool) -> WeatherUnit {
        WeatherUnit {
            id: alias.to_string(),
            alias: alias.to_string(),
            city: city.to_string(),
            state: String::new(),
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            active,
        }
    }

    async fn search(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        match q.get("name").map(String::as_str) {
            Some("Curitiba") => Json(json!({"results": [{"latitude": -25.4, "longitude": -49.3}]})),
            _ => Json(json!({})),
        }
    }

    async fn forecast(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        assert_eq!(q.get("current_weather").map(String::as_str), Some("true"));
        Json(json!({
            "current_weather": {"temperature": 21.5, "windspeed": 7.0, "weathercode": 2}
        }))
    }

    async fn client() -> FeedClient {
        let app = Router::new()
            .route("/v1/search", get(search))
            .route("/v1/forecast", get(forecast));
        let base = stub::serve(app).await;
        FeedClient::new(Endpoints::all_at(&base)).unwrap()
    }

    #[test]
    fn emoji_by_code() {
        assert_eq!(weather_emoji(Some(0)), "☀️");
        assert_eq!(weather_emoji(Some(2)), "⛅");
        assert_eq!(weather_emoji(Some(63)), "🌧️");
        assert_eq!(weather_emoji(Some(99)), "⛈️");
        assert_eq!(weather_emoji(Some(1000)), "🌡️");
        assert_eq!(weather_emoji(None), "🌡️");
    }

    #[tokio::test]
    async fn geocodes_then_reports() {
        let feeds = client().await;
        assert_eq!(feeds.geocode("Curitiba").await.unwrap(), Some((-25.4, -49.3)));
        assert_eq!(feeds.geocode("Atlantis").await.unwrap(), None);

        let report = feeds
            .weather_report(&unit("", "Curitiba", None, true))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.alias, "Curitiba");
        assert_eq!(report.temperature, Some(21.5));
        assert_eq!(report.icon, "⛅");
    }

    #[tokio::test]
    async fn skips_inactive_and_unlocatable_units() {
        let feeds = client().await;
        let units = vec![
            unit("HQ", "", Some((-23.5, -46.6)), true),
            unit("Lost", "Atlantis", None, true),
            unit("Off", "Curitiba", None, false),
        ];
        let reports = feeds.weather(&units).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].alias, "HQ");
    }

    #[tokio::test]
    async fn unreachable_service_yields_nothing() {
        let feeds = FeedClient::new(Endpoints::all_at("http://127.0.0.1:9")).unwrap();
        let reports = feeds
            .weather(&[unit("HQ", "", Some((1.0, 2.0)), true)])
            .await;
        assert!(reports.is_empty());
    }
}
