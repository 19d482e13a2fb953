//! 📊 Google Sheets ledger
//!
//! Talks to the Sheets v4 values API with a bearer token obtained outside this
//! process. Each year gets its own worksheet (`Data_2024`, ...); when the
//! year's worksheet does not exist the first worksheet is used.

use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;

use super::{LedgerError, LedgerStore};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Columns A..F hold the six ledger fields
const COLUMN_SPAN: &str = "A:F";

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

pub struct SheetsLedgerStore {
    client: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    access_token: String,
    year: i32,
    worksheet: OnceCell<String>,
}

impl SheetsLedgerStore {
    pub fn new(
        spreadsheet_id: &str,
        access_token: &str,
        year: i32,
        timeout_secs: u64,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: SHEETS_API.to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
            year,
            worksheet: OnceCell::new(),
        })
    }

    /// Spreadsheet URL with extra path segments, each percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url, LedgerError> {
        let mut url = Url::parse(&self.api_base).map_err(LedgerError::unavailable)?;
        url.path_segments_mut()
            .map_err(|_| LedgerError::unavailable("sheets API base cannot take a path"))?
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn worksheet(&self) -> Result<&str, LedgerError> {
        let title = self
            .worksheet
            .get_or_try_init(|| async {
                let mut url = self.url(&[])?;
                url.query_pairs_mut().append_pair("fields", "sheets.properties.title");

                let body = self.get_text(url).await?;
                let meta: SpreadsheetMeta = serde_json::from_str(&body)
                    .map_err(|e| LedgerError::unavailable(format!("bad spreadsheet metadata: {}", e)))?;
                let titles: Vec<String> = meta.sheets.into_iter().map(|s| s.properties.title).collect();

                let chosen = select_worksheet(&titles, self.year)
                    .ok_or_else(|| LedgerError::unavailable("spreadsheet has no worksheets"))?;
                if chosen != yearly_title(self.year) {
                    warn!("⚠️  Worksheet {} not found, using '{}'", yearly_title(self.year), chosen);
                }
                info!("✅ Sheets ledger worksheet: {}", chosen);
                Ok::<String, LedgerError>(chosen)
            })
            .await?;
        Ok(title.as_str())
    }

    async fn get_text(&self, url: Url) -> Result<String, LedgerError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(LedgerError::unavailable)?;
        read_success_body(response).await
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<String, LedgerError> {
    let status = response.status();
    let body = response.text().await.map_err(LedgerError::unavailable)?;
    if !status.is_success() {
        return Err(LedgerError::unavailable(format!("Sheets API {}: {}", status, body)));
    }
    Ok(body)
}

/// Worksheet title for a year's records
pub fn yearly_title(year: i32) -> String {
    format!("Data_{}", year)
}

/// The year's worksheet if present, otherwise the first one
pub fn select_worksheet(titles: &[String], year: i32) -> Option<String> {
    let wanted = yearly_title(year);
    titles
        .iter()
        .find(|t| **t == wanted)
        .or_else(|| titles.first())
        .cloned()
}

/// A1 range over `span` of a worksheet, title quoted with `'` doubled inside
pub fn a1_range(title: &str, span: &str) -> String {
    format!("'{}'!{}", title.replace('\'', "''"), span)
}

/// Last row of a values response, `None` for an empty range
pub fn parse_last_row(body: &str) -> Result<Option<Vec<String>>, LedgerError> {
    let range: ValueRange = serde_json::from_str(body)
        .map_err(|e| LedgerError::unavailable(format!("bad values response: {}", e)))?;
    Ok(range.values.into_iter().last())
}

#[async_trait]
impl LedgerStore for SheetsLedgerStore {
    fn name(&self) -> &str {
        "sheets"
    }

    async fn read_last_row(&self) -> Result<Option<Vec<String>>, LedgerError> {
        let range = a1_range(self.worksheet().await?, COLUMN_SPAN);
        let url = self.url(&["values", &range])?;
        let body = self.get_text(url).await?;
        parse_last_row(&body)
    }

    async fn append_row(&self, fields: &[String]) -> Result<(), LedgerError> {
        let range = format!("{}:append", a1_range(self.worksheet().await?, COLUMN_SPAN));
        let mut url = self.url(&["values", &range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": [fields] }))
            .send()
            .await
            .map_err(LedgerError::unavailable)?;
        read_success_body(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_select_yearly_worksheet() {
        let available = titles(&["Sheet1", "Data_2023", "Data_2024"]);
        assert_eq!(select_worksheet(&available, 2024).as_deref(), Some("Data_2024"));
    }

    #[test]
    fn test_fallback_to_first_worksheet() {
        let available = titles(&["Sheet1", "Data_2023"]);
        assert_eq!(select_worksheet(&available, 2025).as_deref(), Some("Sheet1"));
        assert_eq!(select_worksheet(&[], 2025), None);
    }

    #[test]
    fn test_parse_last_row() {
        let body = r#"{
            "range": "Data_2024!A1:F3",
            "majorDimension": "ROWS",
            "values": [
                ["ExecutionDate", "ObservationDate", "Level", "Score", "Reasons", "RawSnapshot"],
                ["2024-05-06", "2024-05-03", "0", "0", "", "{}"]
            ]
        }"#;
        let last = parse_last_row(body).unwrap().unwrap();
        assert_eq!(last[0], "2024-05-06");
        assert_eq!(last.len(), 6);
    }

    #[test]
    fn test_parse_empty_range() {
        let body = r#"{"range": "Data_2024!A1:F1000", "majorDimension": "ROWS"}"#;
        assert!(parse_last_row(body).unwrap().is_none());
    }

    #[test]
    fn test_a1_range_quotes_titles() {
        assert_eq!(a1_range("Data_2024", COLUMN_SPAN), "'Data_2024'!A:F");
        assert_eq!(a1_range("Sheet 1", COLUMN_SPAN), "'Sheet 1'!A:F");
        assert_eq!(a1_range("Bob's log", COLUMN_SPAN), "'Bob''s log'!A:F");
    }

    #[test]
    fn test_url_encodes_range() {
        let store = SheetsLedgerStore::new("abc123", "token", 2024, 5).unwrap();
        let range = format!("{}:append", a1_range("Sheet 1", COLUMN_SPAN));
        let url = store.url(&["values", &range]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/'Sheet%201'!A:F:append"
        );
    }
}
