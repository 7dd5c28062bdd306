//! Shared test utilities: fake clients and a handler wired to an in-memory sheet.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::api::{ExtractionInput, Extractor, Ledger, Messenger, TestSheet};
use crate::handler::Handler;
use crate::{Error, ErrorType, Result};
use anyhow::anyhow;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use teloxide::types::{FileId, Update};
use url::Url;

/// The chat id used by the update builders.
pub const CHAT_ID: i64 = 42;

/// A 4x3 PNG with an alpha channel.
pub fn png_image() -> Vec<u8> {
    let pixels = RgbaImage::from_fn(4, 3, |x, y| Rgba([x as u8 * 60, y as u8 * 80, 200, 128]));
    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(pixels)
        .write_to(&mut png, ImageOutputFormat::Png)
        .unwrap();
    png.into_inner()
}

/// Records what the handler sends instead of talking to Telegram. Downloads return `png_image()`
/// unless `set_download` says otherwise.
#[derive(Debug, Default)]
pub struct FakeMessenger {
    sent: Mutex<Vec<(i64, String)>>,
    webhook: Mutex<Option<Url>>,
    download: Mutex<Option<Vec<u8>>>,
    fail_downloads: AtomicBool,
    fail_sends: AtomicBool,
    refuse_webhooks: AtomicBool,
}

impl FakeMessenger {
    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn webhook(&self) -> Option<Url> {
        self.webhook.lock().unwrap().clone()
    }

    pub fn set_download(&self, bytes: impl Into<Vec<u8>>) {
        *self.download.lock().unwrap() = Some(bytes.into());
    }

    pub fn fail_downloads(&self) {
        self.fail_downloads.store(true, Ordering::SeqCst);
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn refuse_webhooks(&self) {
        self.refuse_webhooks.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Messenger for FakeMessenger {
    async fn download_file(&self, file_id: &FileId) -> Result<Vec<u8>> {
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(Error::new(
                ErrorType::Upstream,
                anyhow!("file {} not found", file_id.0),
            ));
        }
        Ok(self
            .download
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(png_image))
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorType::Upstream, anyhow!("chat not found")));
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn set_webhook(&self, url: &Url) -> Result<()> {
        if self.refuse_webhooks.load(Ordering::SeqCst) {
            return Err(Error::new(
                ErrorType::Request,
                anyhow!("Bad Request: bad webhook: HTTPS url must be provided for webhook"),
            ));
        }
        *self.webhook.lock().unwrap() = Some(url.clone());
        Ok(())
    }
}

/// Answers every extraction with the same canned model reply, and records what it was asked.
#[derive(Debug)]
pub struct ScriptedExtractor {
    reply: Option<String>,
    inputs: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// An extractor whose service is unreachable.
    pub fn failing() -> Self {
        Self {
            reply: None,
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Summaries of the inputs, e.g. `text: Lunch $15` or `image/jpeg: Some(Jpeg)`, where the
    /// second part is the format the image bytes actually have.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, input: ExtractionInput<'_>) -> Result<String> {
        let summary = match input {
            ExtractionInput::Text(text) => format!("text: {text}"),
            ExtractionInput::Image { bytes, mime_type } => {
                format!("{mime_type}: {:?}", image::guess_format(bytes).ok())
            }
        };
        self.inputs.lock().unwrap().push(summary);
        self.reply
            .clone()
            .ok_or_else(|| Error::new(ErrorType::Upstream, anyhow!("Gemini API error (503)")))
    }
}

/// A `Handler` over a `TestSheet`, with handles on the fakes so tests can inspect them.
pub struct TestEnv {
    handler: Handler,
    messenger: Arc<FakeMessenger>,
    extractor: Arc<ScriptedExtractor>,
    sheet: TestSheet,
}

impl TestEnv {
    /// A handler over the seeded sheet whose extractor always answers `reply`.
    pub fn seeded(reply: &str) -> Self {
        Self::new(TestSheet::seeded().unwrap(), ScriptedExtractor::new(reply))
    }

    /// A handler over a spreadsheet without any tabs.
    pub fn empty(reply: &str) -> Self {
        Self::new(TestSheet::default(), ScriptedExtractor::new(reply))
    }

    /// A handler over a spreadsheet with the Expenses tab but no Monthly_Totals tab.
    pub fn expenses_only(reply: &str) -> Self {
        Self::new(
            TestSheet::expenses_only().unwrap(),
            ScriptedExtractor::new(reply),
        )
    }

    pub fn failing_extractor() -> Self {
        Self::new(TestSheet::seeded().unwrap(), ScriptedExtractor::failing())
    }

    fn new(sheet: TestSheet, extractor: ScriptedExtractor) -> Self {
        let messenger = Arc::new(FakeMessenger::default());
        let extractor = Arc::new(extractor);
        let handler = Handler::new(
            messenger.clone(),
            extractor.clone(),
            Ledger::new(Box::new(sheet.clone())),
        );
        Self {
            handler,
            messenger,
            extractor,
            sheet,
        }
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn messenger(&self) -> &FakeMessenger {
        &self.messenger
    }

    pub fn extractor(&self) -> &ScriptedExtractor {
        &self.extractor
    }

    pub fn sheet(&self) -> &TestSheet {
        &self.sheet
    }
}

fn message_update(update_id: u32, fields: serde_json::Value) -> Update {
    let mut message = serde_json::json!({
        "message_id": update_id,
        "date": 1760900000,
        "chat": {"id": CHAT_ID, "type": "private", "first_name": "Sam"}
    });
    for (key, value) in fields.as_object().unwrap() {
        message[key] = value.clone();
    }
    let update = serde_json::json!({"update_id": update_id, "message": message});
    serde_json::from_str(&update.to_string()).unwrap()
}

/// An update carrying a text message from `CHAT_ID`.
pub fn text_update(text: &str) -> Update {
    message_update(1000, serde_json::json!({"text": text}))
}

/// An update carrying a photo, in two sizes, from `CHAT_ID`.
pub fn photo_update(file_id: &str) -> Update {
    message_update(
        1001,
        serde_json::json!({
            "photo": [
                {"file_id": "thumbnail", "file_unique_id": "t", "file_size": 900,
                 "width": 90, "height": 120},
                {"file_id": file_id, "file_unique_id": "p", "file_size": 90000,
                 "width": 960, "height": 1280}
            ]
        }),
    )
}

/// An update carrying a file sent as a document, from `CHAT_ID`.
pub fn document_update(file_id: &str, mime_type: &str) -> Update {
    message_update(
        1002,
        serde_json::json!({
            "document": {"file_id": file_id, "file_unique_id": "d", "file_size": 2048,
                         "file_name": "receipt", "mime_type": mime_type}
        }),
    )
}
