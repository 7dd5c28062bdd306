//! Configuration for the bot.
//!
//! Everything is read from command line arguments, which fall back to environment variables. The
//! `Config` validates what every subcommand needs up front and keeps the rest (the Google
//! credentials) as a source string that is loaded on demand.

use crate::api::{CredentialsFile, Mode};
use crate::args::Common;
use crate::error::{ErrorType, IntoResult};
use crate::utils::redact;
use crate::{Error, Result};
use anyhow::{anyhow, Context};
use tracing::debug;

/// The `Config` object holds the settings shared by all subcommands. Its `Debug` output does not
/// include secrets.
#[derive(Clone)]
pub struct Config {
    mode: Mode,
    telegram_bot_token: Option<String>,
    spreadsheet_id: String,
    google_credentials: Option<String>,
}

impl Config {
    /// Validates the common arguments.
    ///
    /// # Errors
    /// - In `Mode::Google`, when the spreadsheet or the credentials are missing, or the spreadsheet
    ///   URL has no id in it.
    pub fn load(common: &Common, mode: Mode) -> Result<Self> {
        let spreadsheet = common.spreadsheet().map(str::trim).unwrap_or_default();
        let spreadsheet_id = extract_spreadsheet_id(spreadsheet)
            .context("Failed to extract the spreadsheet ID")
            .pub_result(ErrorType::Config)?
            .to_string();
        let google_credentials = common
            .google_credentials()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        if mode == Mode::Google {
            if spreadsheet_id.is_empty() {
                return Err(config_error(
                    "The spreadsheet is required, set --spreadsheet or GOOGLE_SHEETS_ID",
                ));
            }
            if google_credentials.is_none() {
                return Err(config_error(
                    "Google credentials are required, set --google-credentials or \
                    GOOGLE_CREDENTIALS_JSON",
                ));
            }
        }

        let telegram_bot_token = common
            .telegram_bot_token()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        debug!(
            "Loaded config: mode {mode:?}, spreadsheet '{spreadsheet_id}', Telegram token {}, \
            Google credentials {}",
            redact(telegram_bot_token.as_deref().unwrap_or_default()),
            redact(google_credentials.as_deref().unwrap_or_default()),
        );

        Ok(Self {
            mode,
            telegram_bot_token,
            spreadsheet_id,
            google_credentials,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The Telegram bot token, which only some subcommands need.
    pub fn telegram_bot_token(&self) -> Result<&str> {
        self.telegram_bot_token.as_deref().ok_or_else(|| {
            config_error(
                "The Telegram bot token is required, set --telegram-bot-token or TELEGRAM_BOT_TOKEN",
            )
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// Loads and parses the Google credentials, which are either inline JSON or a file path.
    pub(crate) async fn credentials(&self) -> Result<CredentialsFile> {
        let source = self.google_credentials.as_deref().ok_or_else(|| {
            config_error(
                "Google credentials are required, set --google-credentials or \
                GOOGLE_CREDENTIALS_JSON",
            )
        })?;
        CredentialsFile::load(source)
            .await
            .pub_result(ErrorType::Config)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("mode", &self.mode)
            .field(
                "telegram_bot_token",
                &redact(self.telegram_bot_token.as_deref().unwrap_or_default()),
            )
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field(
                "google_credentials",
                &redact(self.google_credentials.as_deref().unwrap_or_default()),
            )
            .finish()
    }
}

fn config_error(message: &'static str) -> Error {
    Error::new(ErrorType::Config, anyhow!(message))
}

/// Accepts either a bare spreadsheet id or a URL such as
/// `https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/edit#gid=0`.
fn extract_spreadsheet_id(url: &str) -> anyhow::Result<&str> {
    // Handle empty URL case
    if url.is_empty() {
        return Ok(url);
    }

    if !url.contains('/') {
        return Ok(url);
    }

    // URL format: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...
    // or: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID?foo=bar
    let parts: Vec<&str> = url.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "d" && i + 1 < parts.len() {
            // Extract the ID and remove any query parameters or fragments
            let id_part = parts[i + 1];
            let id = id_part
                .split('?')
                .next()
                .unwrap_or(id_part)
                .split('#')
                .next()
                .unwrap_or(id_part);
            return Ok(id);
        }
    }
    Err(anyhow!(
        "Invalid Google Sheets URL format. Expected: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
    ))
}
