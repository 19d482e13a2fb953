//! 📈 Daily closes from the Yahoo Finance chart API
//!
//! One request per symbol, fetched in sequence and merged into a single
//! date-indexed table. Any symbol failing fails the whole fetch: market data
//! is all-or-nothing for an evaluation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use reqwest::Url;
use serde::Deserialize;

use super::{MarketDataProvider, PriceTable, ProviderError};

/// The chart endpoint rejects requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";

const SECS_PER_DAY: i64 = 86_400;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

pub struct YahooChartClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooChartClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `{base}/v8/finance/chart/{symbol}` with the symbol as one encoded segment
    fn chart_url(&self, symbol: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ProviderError::unavailable(symbol, e))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::unavailable(symbol, "market base URL cannot take a path"))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }

    async fn fetch_symbol(
        &self,
        symbol: &str,
        period1: i64,
        period2: i64,
    ) -> Result<Vec<(NaiveDate, f64)>, ProviderError> {
        let url = self.chart_url(symbol)?;
        let response = self
            .client
            .get(url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::unavailable(symbol, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::unavailable(symbol, e))?;

        // Error bodies still carry a chart.error description worth surfacing
        match parse_chart(symbol, &body) {
            Ok(closes) if status.is_success() => Ok(closes),
            Ok(_) => Err(ProviderError::unavailable(symbol, format!("HTTP {}", status))),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl MarketDataProvider for YahooChartClient {
    async fn fetch_series(
        &self,
        symbols: &[String],
        window_days: u32,
    ) -> Result<PriceTable, ProviderError> {
        let period2 = Utc::now().timestamp();
        let period1 = period2 - i64::from(window_days) * SECS_PER_DAY;

        let mut table = PriceTable::new();
        for symbol in symbols {
            let closes = self.fetch_symbol(symbol, period1, period2).await?;
            info!("📈 {}: {} daily closes", symbol, closes.len());
            merge_closes(&mut table, symbol, closes);
        }
        Ok(table)
    }
}

/// Insert one symbol's closes into the shared table
pub fn merge_closes(table: &mut PriceTable, symbol: &str, closes: Vec<(NaiveDate, f64)>) {
    for (date, close) in closes {
        table.entry(date).or_default().insert(symbol.to_string(), close);
    }
}

/// Exchange-local (date, close) pairs from a chart response body
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<(NaiveDate, f64)>, ProviderError> {
    let parsed: ChartResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::unavailable(symbol, format!("bad response: {}", e)))?;

    if let Some(err) = parsed.chart.error {
        let reason = match err.description {
            Some(desc) => format!("{}: {}", err.code, desc),
            None => err.code,
        };
        return Err(ProviderError::unavailable(symbol, reason));
    }

    let result = parsed
        .chart
        .result
        .and_then(|mut results| {
            if results.is_empty() {
                None
            } else {
                Some(results.swap_remove(0))
            }
        })
        .ok_or_else(|| ProviderError::unavailable(symbol, "empty chart result"))?;

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let offset = result.meta.gmtoffset;
    let series: Vec<(NaiveDate, f64)> = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let close = close.filter(|c| c.is_finite())?;
            let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
            Some((date, close))
        })
        .collect();

    debug!("📈 {} parsed {} closes", symbol, series.len());

    if series.is_empty() {
        return Err(ProviderError::unavailable(symbol, "no closes in response"));
    }
    Ok(series)
}
