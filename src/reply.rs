//! The text of the messages the bot sends. Telegram renders them in HTML parse mode, so anything
//! that came from the user or the model is escaped.

use crate::model::{Category, Expense, ImageSource, MonthlyTotals};
use std::fmt::Write;

pub(crate) const HELP: &str = "🤖 <b>Finance Tracker Bot</b>

Send me:
📷 Receipt photos
💸 Text expenses (e.g., \"Lunch $15\")
📄 Bill screenshots

<b>Commands:</b>
/summary - Current month summary
/setup - Setup Google Sheets";

pub(crate) const SETUP_DONE: &str = "✅ Google Sheets setup completed!";
pub(crate) const SETUP_FAILED: &str = "❌ Failed to setup Google Sheets";
pub(crate) const SUMMARY_FAILED: &str = "❌ Failed to get summary";
pub(crate) const LOG_FAILED: &str = "❌ Failed to log expense";
pub(crate) const DOWNLOAD_FAILED: &str = "❌ Failed to download image";
pub(crate) const DOCUMENT_DOWNLOAD_FAILED: &str = "❌ Failed to download document";
pub(crate) const PROCESS_FAILED: &str = "❌ Failed to process image";
pub(crate) const DOCUMENT_PROCESS_FAILED: &str = "❌ Failed to process document";
pub(crate) const NOT_AN_IMAGE: &str = "📄 Please send an image file";
pub(crate) const UNPROCESSABLE: &str = "❌ Could not process your message";

/// Text from the user or the model is cut to this many characters before it is escaped, which
/// keeps every reply under Telegram's message length limit.
const MAX_FIELD_CHARS: usize = 1000;

/// Escapes the characters that Telegram's HTML parse mode treats as markup.
pub(crate) fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Cuts `s` to `MAX_FIELD_CHARS` and escapes it.
fn field(s: &str) -> String {
    match s.char_indices().nth(MAX_FIELD_CHARS) {
        Some((ix, _)) => format!("{}…", escape_html(&s[..ix])),
        None => escape_html(s),
    }
}

/// A failure reply, e.g. `❌ Not a valid expense`.
pub(crate) fn failure(message: &str) -> String {
    format!("❌ {}", field(message))
}

pub(crate) fn download_failed(source: ImageSource) -> &'static str {
    match source {
        ImageSource::Photo => DOWNLOAD_FAILED,
        ImageSource::Document => DOCUMENT_DOWNLOAD_FAILED,
    }
}

pub(crate) fn process_failed(source: ImageSource) -> &'static str {
    match source {
        ImageSource::Photo => PROCESS_FAILED,
        ImageSource::Document => DOCUMENT_PROCESS_FAILED,
    }
}

pub(crate) fn expense_logged(expense: &Expense) -> String {
    let description = match expense.description() {
        "" => "N/A".to_string(),
        d => field(d),
    };
    format!(
        "✅ <b>Expense Logged!</b>\n\n\
        💰 Amount: {}\n\
        📂 Category: {}\n\
        📝 Description: {description}\n\
        📅 Date: {}\n\
        🏪 Merchant: {}",
        expense.amount().pretty(),
        expense.category(),
        expense.date().format("%Y-%m-%d"),
        expense.merchant().map(field).as_deref().unwrap_or("N/A"),
    )
}

pub(crate) fn monthly_summary(totals: &MonthlyTotals) -> String {
    let mut s = format!(
        "📊 <b>Monthly Summary ({})</b>\n\n💰 <b>Total:</b> {}\n\n<b>By Category:</b>",
        totals.month(),
        totals.total()
    );
    for category in Category::ALL {
        // Writing to a String cannot fail.
        let _ = write!(
            s,
            "\n{} {}: {}",
            category.emoji(),
            category.header(),
            totals.subtotal(category)
        );
    }
    s
}
