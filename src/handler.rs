//! The message handler: turns one Telegram `Update` into at most one reply, and at most one logged
//! expense.

use crate::api::{ExtractionInput, Extractor, Ledger, Messenger};
use crate::error::{ErrorType, IntoResult};
use crate::model::{
    parse_reply, BotCommand, Expense, ExtractionError, ImageSource, Inbound, LiteralExpense, Month,
};
use crate::{receipt, reply};
use crate::{Error, Result};
use std::sync::Arc;
use teloxide::types::{FileId, Update, UpdateKind};
use tracing::{debug, error, info, warn};

/// Dispatches inbound messages to the command, text and image paths. The clients are injected so
/// that tests can substitute fakes.
pub struct Handler {
    messenger: Arc<dyn Messenger>,
    extractor: Arc<dyn Extractor>,
    ledger: Ledger,
}

impl Handler {
    pub fn new(messenger: Arc<dyn Messenger>, extractor: Arc<dyn Extractor>, ledger: Ledger) -> Self {
        Self {
            messenger,
            extractor,
            ledger,
        }
    }

    pub fn messenger(&self) -> &dyn Messenger {
        self.messenger.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Handles one update and returns the reply that was sent, or `None` if the update was ignored.
    /// The only error is a failure to send the reply.
    pub async fn handle(&self, update: &Update) -> Result<Option<String>> {
        let UpdateKind::Message(message) = &update.kind else {
            debug!("Ignoring update {} because it has no message", update.id.0);
            return Ok(None);
        };

        let reply = self.reply_for(Inbound::from(message)).await;
        self.messenger.send_message(message.chat.id.0, &reply).await?;
        Ok(Some(reply))
    }

    async fn reply_for(&self, inbound: Inbound) -> String {
        match inbound {
            Inbound::Command(command) => self.command(command).await,
            Inbound::Text(text) => match self.log_text(&text).await {
                Ok(expense) => reply::expense_logged(&expense),
                Err(e) => failure_reply(&e),
            },
            Inbound::Image { file_id, source } => self.image(&file_id, source).await,
            Inbound::NotAnImage { mime_type } => {
                info!("Refusing a document of type {mime_type:?}");
                reply::NOT_AN_IMAGE.to_string()
            }
            Inbound::Unsupported => {
                info!("Received a message that is neither text nor an image");
                reply::UNPROCESSABLE.to_string()
            }
        }
    }

    async fn image(&self, file_id: &FileId, source: ImageSource) -> String {
        let bytes = match self.messenger.download_file(file_id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Unable to download {source:?} {file_id:?}: {e}");
                return reply::download_failed(source).to_string();
            }
        };
        let jpeg = match receipt::to_jpeg(&bytes) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                warn!("Unable to process a {} byte {source:?}: {e:#}", bytes.len());
                return reply::process_failed(source).to_string();
            }
        };
        match self.log_image(&jpeg).await {
            Ok(expense) => reply::expense_logged(&expense),
            Err(e) => failure_reply(&e),
        }
    }

    async fn command(&self, command: BotCommand) -> String {
        match command {
            BotCommand::Start => reply::HELP.to_string(),
            BotCommand::Unknown(name) => {
                info!("Unknown command {name}, answering with the help text");
                reply::HELP.to_string()
            }
            BotCommand::Setup => match self.ledger.setup().await {
                Ok(()) => {
                    info!("Spreadsheet setup completed");
                    reply::SETUP_DONE.to_string()
                }
                Err(e) => {
                    error!("Spreadsheet setup failed: {e:#}");
                    reply::SETUP_FAILED.to_string()
                }
            },
            BotCommand::Summary => {
                let month = Month::current();
                match self.ledger.monthly_summary(month).await {
                    Ok(totals) => reply::monthly_summary(&totals),
                    Err(e) => {
                        error!("Unable to read the {month} summary: {e:#}");
                        reply::SUMMARY_FAILED.to_string()
                    }
                }
            }
        }
    }

    async fn log_text(&self, text: &str) -> Result<Expense> {
        let raw = self.extractor.extract(ExtractionInput::Text(text)).await?;
        let mut expense = to_expense(&raw)?;
        if let Some(literal) = LiteralExpense::parse(text) {
            literal.apply(&mut expense);
        }
        self.log(expense).await
    }

    async fn log_image(&self, jpeg: &[u8]) -> Result<Expense> {
        debug!("Extracting an expense from a {} byte JPEG", jpeg.len());
        let raw = self
            .extractor
            .extract(ExtractionInput::Image {
                bytes: jpeg,
                mime_type: "image/jpeg",
            })
            .await?;
        let expense = to_expense(&raw)?;
        self.log(expense).await
    }

    async fn log(&self, expense: Expense) -> Result<Expense> {
        self.ledger
            .log_expense(&expense)
            .await
            .pub_result(ErrorType::Storage)?;
        info!(
            "Logged {} {} expense dated {}",
            expense.amount(),
            expense.category(),
            expense.date()
        );
        Ok(expense)
    }
}

fn to_expense(raw: &str) -> Result<Expense> {
    let today = chrono::Local::now().date_naive();
    parse_reply(raw)
        .and_then(|extracted| extracted.into_expense(today))
        .pub_result(ErrorType::Extraction)
}

/// Chooses the reply for a failed text or image message, and logs the error.
fn failure_reply(e: &Error) -> String {
    match e.error_type() {
        ErrorType::Extraction => {
            warn!("No expense was extracted: {e}");
            match e.root_cause().downcast_ref::<ExtractionError>() {
                Some(extraction) => reply::failure(&extraction.user_message()),
                None => reply::UNPROCESSABLE.to_string(),
            }
        }
        ErrorType::Storage => {
            error!("Unable to log the expense: {e}");
            reply::LOG_FAILED.to_string()
        }
        ErrorType::Config | ErrorType::Request | ErrorType::Upstream => {
            error!("Unable to process the message: {e}");
            reply::UNPROCESSABLE.to_string()
        }
    }
}
