//! Runs the webhook server.

use crate::api::{self, GeminiClient, TelegramClient};
use crate::args::ServeArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::handler::Handler;
use crate::{server, Config, Error, Result};
use anyhow::anyhow;
use std::sync::Arc;
use tracing::info;

/// Builds the clients, wires them into a `Handler` and serves webhooks on `args.port()` until
/// Ctrl-C.
///
/// # Errors
/// - Returns an error if the Telegram token or the Gemini key is missing, if the spreadsheet
///   credentials cannot be loaded, or if the port cannot be bound.
pub async fn serve(config: Config, args: &ServeArgs) -> Result<Out<()>> {
    let token = config.telegram_bot_token()?;
    if args.gemini_api_key().trim().is_empty() {
        return Err(Error::new(
            ErrorType::Config,
            anyhow!("The Gemini API key is required, set --gemini-api-key or GEMINI_API_KEY"),
        ));
    }

    let http = api::http_client().pub_result(ErrorType::Config)?;
    let messenger = Arc::new(TelegramClient::new(token));
    let extractor = Arc::new(GeminiClient::new(
        args.gemini_api_key().trim(),
        args.gemini_model(),
        http.clone(),
    ));
    let ledger = api::ledger(&config, http).await?;
    let handler = Arc::new(Handler::new(messenger, extractor, ledger));

    info!(
        "Serving with Gemini model {} in {:?} mode",
        args.gemini_model(),
        config.mode()
    );
    server::serve(handler, args.port())
        .await
        .pub_result(ErrorType::Config)?;
    Ok("The server has stopped".into())
}
