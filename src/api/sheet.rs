//! Implements the `Sheet` trait using the `sheets::Client` to interact with a Google sheet.
//!
//! Reads go through the `sheets` crate. Writes and tab management use the Sheets REST API directly
//! with the same access token, because the `sheets` crate only sends cell values as strings.

use crate::api::{Sheet, SheetRange, TokenProvider};
use crate::error::Res;
use crate::model::Cell;
use anyhow::{bail, Context};
use serde::Deserialize;
use sheets::types::{DateTimeRenderOption, Dimension, ValueRenderOption};
use sheets::ClientError;
use tracing::trace;
use url::Url;

const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Implements the `Sheet` trait for a Google sheet. It asks the `TokenProvider` for an access
/// token before each call, which refreshes the token when it is about to expire.
pub(super) struct GoogleSheet {
    spreadsheet_id: String,
    token_provider: TokenProvider,
    http: reqwest::Client,
}

impl GoogleSheet {
    pub(super) fn new(
        spreadsheet_id: impl Into<String>,
        token_provider: TokenProvider,
        http: reqwest::Client,
    ) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            token_provider,
            http,
        }
    }

    async fn client(&self) -> Res<sheets::Client> {
        let access_token = self.token_provider.token().await?;
        Ok(create_sheets_client(access_token))
    }

    /// Builds a REST URL for this spreadsheet, e.g. `.../spreadsheets/{id}:batchUpdate`.
    fn url(&self, suffix: &str) -> Res<Url> {
        Url::parse(&format!("{SHEETS_API_URL}/{}{suffix}", self.spreadsheet_id))
            .context("Unable to build a Sheets API URL")
    }

    async fn post(&self, url: Url, body: &serde_json::Value, what: &str) -> Res<()> {
        let access_token = self.token_provider.token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send the {what} request to the Sheets API"))?;
        check_status(response, what).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetMetadata>,
}

#[derive(Debug, Deserialize)]
struct SheetMetadata {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn sheet_names(&self) -> Res<Vec<String>> {
        trace!("sheet_names");
        let mut url = self.url("")?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");
        let access_token = self.token_provider.token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .context("Failed to send the spreadsheet metadata request to the Sheets API")?;
        let metadata: SpreadsheetMetadata = check_status(response, "spreadsheet metadata")
            .await?
            .json()
            .await
            .context("Failed to parse the spreadsheet metadata")?;
        Ok(metadata
            .sheets
            .into_iter()
            .map(|s| s.properties.title)
            .collect())
    }

    async fn add_sheets(&self, names: &[&str]) -> Res<()> {
        trace!("add_sheets {names:?}");
        let requests: Vec<serde_json::Value> = names
            .iter()
            .map(|name| serde_json::json!({ "addSheet": { "properties": { "title": name } } }))
            .collect();
        let url = self.url(":batchUpdate")?;
        self.post(url, &serde_json::json!({ "requests": requests }), "add sheets")
            .await
    }

    async fn get(&self, sheet_name: &str) -> Res<Vec<Vec<String>>> {
        trace!("get for {sheet_name}");
        let range = format!("{sheet_name}!A:ZZ"); // Get all columns
        let response = self
            .client()
            .await?
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                &range,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch {sheet_name} sheet data"))?;
        Ok(response.body.values)
    }

    async fn write_ranges(&self, data: &[SheetRange]) -> Res<()> {
        trace!("write_ranges {} ranges", data.len());
        let url = self.url("/values:batchUpdate")?;
        self.post(url, &batch_update_body(data), "write ranges")
            .await
    }

    async fn append(&self, sheet_name: &str, rows: &[Vec<Cell>]) -> Res<()> {
        trace!("append {} rows to {sheet_name}", rows.len());
        let mut url = self.url("/values/")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("The Sheets API URL cannot have path segments"))?
            .pop_if_empty()
            .push(&format!("{sheet_name}!A:ZZ:append"));
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        self.post(
            url,
            &append_body(rows),
            &format!("append to {sheet_name}"),
        )
        .await
    }
}

/// Values are written RAW: USER_ENTERED would turn "2025-10" in the Month column into a date.
/// Amounts are numbers, see `Cell::to_json`.
fn batch_update_body(data: &[SheetRange]) -> serde_json::Value {
    let data: Vec<serde_json::Value> = data
        .iter()
        .map(|sr| {
            serde_json::json!({
                "range": sr.range,
                "majorDimension": "ROWS",
                "values": values_json(&sr.values),
            })
        })
        .collect();
    serde_json::json!({
        "valueInputOption": "RAW",
        "includeValuesInResponse": false,
        "data": data,
    })
}

fn append_body(rows: &[Vec<Cell>]) -> serde_json::Value {
    serde_json::json!({ "majorDimension": "ROWS", "values": values_json(rows) })
}

fn values_json(rows: &[Vec<Cell>]) -> Vec<Vec<serde_json::Value>> {
    rows.iter()
        .map(|row| row.iter().map(Cell::to_json).collect())
        .collect()
}

/// Returns the response if its status is a success, otherwise an error containing the body.
async fn check_status(response: reqwest::Response, what: &str) -> Res<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
    bail!("Sheets API {what} request failed with status {status}: {body}")
}

/// Creates a new sheets client from an access token.
fn create_sheets_client(access_token: String) -> sheets::Client {
    // The sheets crate requires client_id, client_secret, and redirect_uri, but we don't need them
    // for API calls, only the access token. Refreshing is handled by the `TokenProvider`.
    sheets::Client::new(
        String::new(),
        String::new(),
        String::new(),
        access_token,
        String::new(),
    )
}

fn map_client_error(e: sheets::ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    anyhow::Error::new(e).context(error_name)
}
