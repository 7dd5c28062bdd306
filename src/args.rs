//! These structs provide the CLI interface for the expense-bot CLI.

use crate::api::DEFAULT_GEMINI_MODEL;
use crate::model::Month;
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

/// expense-bot: A Telegram bot that logs expenses to a Google Sheet.
///
/// Send the bot a message like "Lunch $15.50", or a photo of a receipt, and it asks Gemini to
/// extract the expense and appends it to the Expenses tab of your sheet. The Monthly_Totals tab is
/// kept up to date as expenses are logged.
///
/// Google access uses a service account key (share the spreadsheet with its client_email), or
/// "authorized_user" OAuth credentials. Set EXPENSE_BOT_IN_TEST_MODE to use an in-memory sheet
/// instead.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the webhook server.
    ///
    /// Telegram delivers updates to POST /webhook. Use the set-webhook subcommand, or POST
    /// {"webhook_url": "..."} to /set_webhook, to tell Telegram where the server is.
    Serve(ServeArgs),
    /// Create the Expenses and Monthly_Totals tabs and their header rows, if missing.
    Setup,
    /// Register the URL that Telegram should deliver updates to.
    SetWebhook(SetWebhookArgs),
    /// Print the totals for a month.
    Summary(SummaryArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The Telegram Bot API token from @BotFather.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_bot_token: Option<String>,

    /// The Google spreadsheet, either its id or its URL, e.g.
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long, env = "GOOGLE_SHEETS_ID")]
    spreadsheet: Option<String>,

    /// Google service account or "authorized_user" credentials: either the JSON itself or the path
    /// to a JSON file.
    #[arg(long, env = "GOOGLE_CREDENTIALS_JSON", hide_env_values = true)]
    google_credentials: Option<String>,
}

impl Common {
    pub fn new(
        log_level: LevelFilter,
        telegram_bot_token: Option<String>,
        spreadsheet: Option<String>,
        google_credentials: Option<String>,
    ) -> Self {
        Self {
            log_level,
            telegram_bot_token,
            spreadsheet,
            google_credentials,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn telegram_bot_token(&self) -> Option<&str> {
        self.telegram_bot_token.as_deref()
    }

    pub fn spreadsheet(&self) -> Option<&str> {
        self.spreadsheet.as_deref()
    }

    pub fn google_credentials(&self) -> Option<&str> {
        self.google_credentials.as_deref()
    }
}

/// (Not shown): Args for the `expense-bot serve` command.
#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// The Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: String,

    /// The Gemini model used for extraction.
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    gemini_model: String,

    /// The port to listen on.
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,
}

impl ServeArgs {
    pub fn new(gemini_api_key: impl Into<String>, gemini_model: impl Into<String>, port: u16) -> Self {
        Self {
            gemini_api_key: gemini_api_key.into(),
            gemini_model: gemini_model.into(),
            port,
        }
    }

    pub fn gemini_api_key(&self) -> &str {
        &self.gemini_api_key
    }

    pub fn gemini_model(&self) -> &str {
        &self.gemini_model
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// (Not shown): Args for the `expense-bot set-webhook` command.
#[derive(Debug, Parser, Clone)]
pub struct SetWebhookArgs {
    /// The public HTTPS URL of the /webhook route, e.g. https://bot.example.com/webhook
    url: url::Url,
}

impl SetWebhookArgs {
    pub fn new(url: url::Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

/// (Not shown): Args for the `expense-bot summary` command.
#[derive(Debug, Parser, Clone)]
pub struct SummaryArgs {
    /// The month, formatted as YYYY-MM. Defaults to the current month.
    #[arg(long)]
    month: Option<Month>,
}

impl SummaryArgs {
    pub fn new(month: Option<Month>) -> Self {
        Self { month }
    }

    pub fn month(&self) -> Month {
        self.month.unwrap_or_else(Month::current)
    }
}
