//! 🏛️ FRED macro series via HTTP API
//!
//! Pulls the newest observations of a series in descending date order and
//! returns the first one with a numeric value (FRED marks gaps with ".").

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use super::{MacroDataProvider, ProviderError};

/// Observations requested per call; enough to step over a few gap markers
const OBSERVATION_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

pub struct FredClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FredClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl MacroDataProvider for FredClient {
    async fn fetch_latest(&self, series_id: &str) -> Result<f64, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::unavailable(series_id, "FRED_API_KEY not configured"));
        }

        let url = format!("{}/series/observations", self.base_url);
        let limit = OBSERVATION_LIMIT.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("series_id", series_id),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::unavailable(series_id, e))?;

        if !response.status().is_success() {
            return Err(ProviderError::unavailable(
                series_id,
                format!("HTTP {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::unavailable(series_id, e))?;

        parse_latest_observation(series_id, &body)
    }
}

/// First numeric observation in a descending-order response body
pub fn parse_latest_observation(series_id: &str, body: &str) -> Result<f64, ProviderError> {
    let parsed: ObservationsResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::unavailable(series_id, format!("bad response: {}", e)))?;

    parsed
        .observations
        .iter()
        .find_map(|obs| {
            let value = obs.value.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
            debug!("🏛️  {} = {} ({})", series_id, value, obs.date);
            Some(value)
        })
        .ok_or_else(|| ProviderError::unavailable(series_id, "no numeric observations"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_latest_value() {
        let body = r#"{
            "realtime_start": "2024-05-06",
            "observations": [
                {"realtime_start": "2024-05-06", "date": "2024-05-03", "value": "-1.27"},
                {"realtime_start": "2024-05-06", "date": "2024-05-02", "value": "-1.31"}
            ]
        }"#;
        assert_eq!(parse_latest_observation("T10Y3M", body).unwrap(), -1.27);
    }

    #[test]
    fn test_skips_gap_markers() {
        let body = r#"{"observations": [
            {"date": "2024-05-27", "value": "."},
            {"date": "2024-05-24", "value": "-0.48"}
        ]}"#;
        assert_eq!(parse_latest_observation("NFCI", body).unwrap(), -0.48);
    }

    #[test]
    fn test_no_numeric_observation() {
        let body = r#"{"observations": [{"date": "2024-05-27", "value": "."}]}"#;
        let err = parse_latest_observation("NFCI", body).unwrap_err();
        assert!(err.to_string().contains("NFCI unavailable"));
    }

    #[test]
    fn test_malformed_body() {
        assert!(parse_latest_observation("T10Y3M", "<html>rate limited</html>").is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_unavailable() {
        let client = FredClient::new("https://api.stlouisfed.org/fred", "", 5).unwrap();
        let err = client.fetch_latest("T10Y3M").await.unwrap_err();
        assert!(matches!(err, ProviderError::DataUnavailable { .. }));
    }
}
