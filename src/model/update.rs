//! What an inbound Telegram message asks the bot to do. Webhook bodies are parsed into teloxide's
//! `Update`; this module classifies its `Message`.

use teloxide::types::{FileId, Message};

/// The chat commands the bot understands.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BotCommand {
    Start,
    Summary,
    Setup,
    Unknown(String),
}

impl BotCommand {
    /// Parses the first word of `text`, e.g. `/summary` or `/summary@my_expense_bot`. Returns `None`
    /// if `text` does not start with a slash.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(name, _bot)| name);
        Some(match name.to_lowercase().as_str() {
            "start" | "help" => BotCommand::Start,
            "summary" => BotCommand::Summary,
            "setup" => BotCommand::Setup,
            _ => BotCommand::Unknown(word.to_string()),
        })
    }
}

/// Where an image came from. The failure replies name it.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ImageSource {
    Photo,
    Document,
}

/// What a `Message` asks the bot to do.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Inbound {
    Command(BotCommand),
    Text(String),
    Image {
        file_id: FileId,
        source: ImageSource,
    },
    /// A document that is not an image.
    NotAnImage {
        mime_type: Option<String>,
    },
    Unsupported,
}

/// Photos win over documents, which win over text.
impl From<&Message> for Inbound {
    fn from(message: &Message) -> Self {
        // The last size is the highest resolution.
        if let Some(photo) = message.photo().and_then(|sizes| sizes.last()) {
            return Inbound::Image {
                file_id: photo.file.id.clone(),
                source: ImageSource::Photo,
            };
        }
        if let Some(document) = message.document() {
            let mime_type = document.mime_type.as_ref().map(|m| m.to_string());
            return match mime_type {
                Some(mime) if mime.starts_with("image/") => Inbound::Image {
                    file_id: document.file.id.clone(),
                    source: ImageSource::Document,
                },
                other => Inbound::NotAnImage { mime_type: other },
            };
        }
        match message.text().map(str::trim) {
            Some(text) if !text.is_empty() => match BotCommand::parse(text) {
                Some(command) => Inbound::Command(command),
                None => Inbound::Text(text.to_string()),
            },
            _ => Inbound::Unsupported,
        }
    }
}
