use crate::api::{Messenger, TelegramClient};
use crate::commands::Out;
use crate::{Config, Result};
use url::Url;

/// Tells Telegram to deliver updates to `url`.
pub async fn set_webhook(config: Config, url: &Url) -> Result<Out<()>> {
    TelegramClient::new(config.telegram_bot_token()?)
        .set_webhook(url)
        .await?;
    Ok(format!("Webhook set to {url}").into())
}
