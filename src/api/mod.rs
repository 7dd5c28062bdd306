//! Clients for the external services: Google Sheets, Telegram and Gemini.
//!
//! Each service sits behind a trait so that the handler can be exercised top-to-bottom without the
//! network. The `Sheet` trait has an in-memory implementation, `TestSheet`, which is compiled into
//! the production binary as well and selected with `Mode::Test`.

mod files;
mod gemini;
mod ledger;
mod oauth;
mod sheet;
mod sheet_test_client;
mod telegram;

use crate::error::{ErrorType, IntoResult, Res};
use crate::model::Cell;
use crate::{Config, Result};
use std::time::Duration;
use teloxide::types::FileId;
use url::Url;

pub use gemini::{GeminiClient, DEFAULT_MODEL as DEFAULT_GEMINI_MODEL};
pub use ledger::Ledger;
pub use telegram::TelegramClient;

pub(crate) use files::CredentialsFile;
pub(crate) use oauth::TokenProvider;
pub(crate) use sheet_test_client::TestSheet;

/// The name of the tab that holds one row per expense.
pub(crate) const EXPENSES: &str = "Expenses";

/// The name of the tab that holds one row per month.
pub(crate) const MONTHLY_TOTALS: &str = "Monthly_Totals";

/// Environment variable that, when set and non-empty, selects `Mode::Test`.
const TEST_MODE_ENV: &str = "EXPENSE_BOT_IN_TEST_MODE";

/// Timeout applied to every outbound HTTP request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Whether the program talks to Google Sheets or to an in-memory sheet.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Google,
    Test,
}

impl Mode {
    /// Returns `Mode::Test` when `EXPENSE_BOT_IN_TEST_MODE` is set and non-empty.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// A range of cells, in A1 notation, and the values to write into it.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub(crate) struct SheetRange {
    pub(crate) range: String,
    pub(crate) values: Vec<Vec<Cell>>,
}

impl SheetRange {
    pub(crate) fn new(range: impl Into<String>, values: Vec<Vec<Cell>>) -> Self {
        Self {
            range: range.into(),
            values,
        }
    }
}

/// The spreadsheet operations that the `Ledger` needs.
#[async_trait::async_trait]
pub(crate) trait Sheet: Send + Sync {
    /// The titles of all tabs in the spreadsheet.
    async fn sheet_names(&self) -> Res<Vec<String>>;

    /// Adds empty tabs with the given titles.
    async fn add_sheets(&self, names: &[&str]) -> Res<()>;

    /// All values of a tab, as formatted strings. Trailing empty cells are omitted.
    async fn get(&self, sheet_name: &str) -> Res<Vec<Vec<String>>>;

    /// Overwrites the given ranges.
    async fn write_ranges(&self, data: &[SheetRange]) -> Res<()>;

    /// Appends rows after the last row of a tab.
    async fn append(&self, sheet_name: &str, rows: &[Vec<Cell>]) -> Res<()>;
}

/// The chat platform operations.
#[async_trait::async_trait]
pub trait Messenger: Send + Sync {
    /// Downloads the bytes of the file with the given `file_id`.
    async fn download_file(&self, file_id: &FileId) -> Result<Vec<u8>>;

    /// Sends an HTML-formatted message to a chat.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Registers the URL that the chat platform will deliver updates to.
    async fn set_webhook(&self, url: &Url) -> Result<()>;
}

/// What to extract an expense from.
#[derive(Debug, Clone, Copy)]
pub enum ExtractionInput<'a> {
    Text(&'a str),
    Image { bytes: &'a [u8], mime_type: &'a str },
}

/// The AI extraction service. Returns the raw text of the model's reply, which is parsed with
/// `model::parse_reply`.
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, input: ExtractionInput<'_>) -> Result<String>;
}

/// Creates the shared HTTP client.
pub fn http_client() -> Res<reqwest::Client> {
    use anyhow::Context;
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Unable to create the HTTP client")
}

/// Creates the `Ledger` for the configured spreadsheet.
pub async fn ledger(config: &Config, http: reqwest::Client) -> Result<Ledger> {
    Ok(Ledger::new(sheet(config, http).await?))
}

/// Creates a `Sheet` for either Google Sheets or, in `Mode::Test`, an in-memory sheet seeded with a
/// few expenses.
pub(crate) async fn sheet(config: &Config, http: reqwest::Client) -> Result<Box<dyn Sheet>> {
    match config.mode() {
        Mode::Google => {
            let credentials = config.credentials().await?;
            let token_provider = TokenProvider::new(credentials, http.clone());
            Ok(Box::new(sheet::GoogleSheet::new(
                config.spreadsheet_id(),
                token_provider,
                http,
            )))
        }
        Mode::Test => Ok(Box::new(
            TestSheet::seeded().pub_result(ErrorType::Storage)?,
        )),
    }
}
