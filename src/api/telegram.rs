//! The Telegram Bot API client: a `Messenger` over `teloxide::Bot`.

use crate::api::Messenger;
use crate::error::{ErrorType, IntoResult};
use crate::{Error, Result};
use anyhow::Context;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatId, FileId, ParseMode};
use teloxide::RequestError;
use tracing::debug;
use url::Url;

/// Telegram rejects messages longer than this.
const MAX_MESSAGE_LEN: usize = 4096;

pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }
}

#[async_trait::async_trait]
impl Messenger for TelegramClient {
    async fn download_file(&self, file_id: &FileId) -> Result<Vec<u8>> {
        let file = self
            .bot
            .get_file(file_id.clone())
            .await
            .context("Failed to look up the file on Telegram")
            .pub_result(ErrorType::Upstream)?;
        let mut bytes: Vec<u8> = Vec::new();
        self.bot
            .download_file(&file.path, &mut bytes)
            .await
            .context("Failed to download the file from Telegram")
            .pub_result(ErrorType::Upstream)?;
        debug!("Downloaded {} bytes from Telegram", bytes.len());
        Ok(bytes)
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), truncate_html(text, MAX_MESSAGE_LEN))
            .parse_mode(ParseMode::Html)
            .await
            .context("Failed to send the reply to Telegram")
            .pub_result(ErrorType::Upstream)?;
        Ok(())
    }

    async fn set_webhook(&self, url: &Url) -> Result<()> {
        match self.bot.set_webhook(url.clone()).await {
            Ok(_) => Ok(()),
            // The request reached Telegram, and Telegram said no.
            Err(e @ RequestError::Api(_)) => Err(Error::new(
                ErrorType::Request,
                anyhow::Error::new(e).context("Telegram refused the webhook"),
            )),
            Err(e) => Err(Error::new(
                ErrorType::Upstream,
                anyhow::Error::new(e).context("Failed to send the setWebhook request to Telegram"),
            )),
        }
    }
}

/// Cuts HTML `text` to at most `max` characters. A cut that would split an entity such as `&amp;`
/// or a tag backs off to just before it.
fn truncate_html(text: &str, max: usize) -> &str {
    let cut = match text.char_indices().nth(max) {
        Some((ix, _)) => &text[..ix],
        None => return text,
    };
    let mut end = cut.len();
    if let Some(amp) = cut.rfind('&') {
        if !cut[amp..].contains(';') {
            end = end.min(amp);
        }
    }
    if let Some(lt) = cut.rfind('<') {
        if !cut[lt..].contains('>') {
            end = end.min(lt);
        }
    }
    &cut[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::escape_html;

    #[test]
    fn test_truncate_html() {
        assert_eq!(truncate_html("hello", 10), "hello");
        assert_eq!(truncate_html("hello", 2), "he");
        assert_eq!(truncate_html("💰💰💰", 2), "💰💰");
    }

    #[test]
    fn test_truncate_html_keeps_entities_whole() {
        // The cut after 9 characters lands inside the second "&amp;".
        assert_eq!(truncate_html("a&amp;a&amp;", 9), "a&amp;a");
        assert_eq!(truncate_html("x <b>bold</b>", 4), "x ");

        let escaped = escape_html(&"a&".repeat(3000));
        let cut = truncate_html(&escaped, MAX_MESSAGE_LEN);
        assert!(cut.chars().count() <= MAX_MESSAGE_LEN);
        assert!(cut.ends_with("&amp;") || cut.ends_with('a'));
        assert_eq!(cut.matches('&').count(), cut.matches("&amp;").count());
    }
}
