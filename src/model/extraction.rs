//! The typed parse of the AI model's reply.
//!
//! The model is asked for a JSON object shaped like `ExtractedExpense`, or `{"error": "..."}` when
//! the input is not an expense. Models like to wrap JSON in Markdown code fences, and sometimes add
//! a sentence around it, so the reply is trimmed down to the outermost JSON object before parsing.

use crate::model::{Amount, Category, Expense};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::warn;

/// The fields the model is asked to extract. Everything is optional here so that a missing field
/// can be reported precisely by `into_expense` rather than as a generic parse failure.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, JsonSchema)]
#[schemars(title = "Expense")]
pub struct ExtractedExpense {
    /// The amount paid, as a plain number without a currency symbol.
    #[schemars(with = "Option<f64>")]
    pub amount: Option<Amount>,

    /// The expense category.
    #[schemars(with = "Option<Category>")]
    pub category: Option<String>,

    /// A brief description of the expense.
    pub description: Option<String>,

    /// The date of the expense in YYYY-MM-DD format. Use today if it is not clear.
    pub date: Option<String>,

    /// The store or company name, if available.
    pub merchant: Option<String>,
}

/// Why a model reply could not be turned into an `Expense`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ExtractionError {
    /// The reply was not the JSON we asked for.
    Unparseable(String),
    /// The model said the input is not an expense.
    Rejected(String),
    /// The reply had no amount.
    MissingAmount,
    /// The reply had a negative amount.
    NegativeAmount(Amount),
}

impl Display for ExtractionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionError::Unparseable(reason) => {
                write!(f, "Unable to parse the AI reply: {reason}")
            }
            ExtractionError::Rejected(reason) => write!(f, "The AI rejected the input: {reason}"),
            ExtractionError::MissingAmount => write!(f, "The AI reply has no amount"),
            ExtractionError::NegativeAmount(amount) => {
                write!(f, "The AI reply has a negative amount: {amount}")
            }
        }
    }
}

impl std::error::Error for ExtractionError {}

impl ExtractionError {
    /// The text shown to the chat user.
    pub fn user_message(&self) -> String {
        match self {
            ExtractionError::Unparseable(_) => "Failed to parse AI response".to_string(),
            ExtractionError::Rejected(reason) => reason.clone(),
            ExtractionError::MissingAmount => "Could not find an amount in your message".to_string(),
            ExtractionError::NegativeAmount(_) => "Expense amounts cannot be negative".to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModelReply {
    Rejected { error: String },
    Expense(ExtractedExpense),
}

/// Parses the raw text of a model reply.
pub fn parse_reply(text: &str) -> Result<ExtractedExpense, ExtractionError> {
    let json = json_object(text)
        .ok_or_else(|| ExtractionError::Unparseable("no JSON object found".to_string()))?;
    match serde_json::from_str::<ModelReply>(json) {
        Ok(ModelReply::Rejected { error }) => Err(ExtractionError::Rejected(error)),
        Ok(ModelReply::Expense(expense)) => Ok(expense),
        Err(e) => Err(ExtractionError::Unparseable(e.to_string())),
    }
}

/// Finds the outermost JSON object in `text`, ignoring code fences and surrounding prose.
fn json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

impl ExtractedExpense {
    /// Validates the extracted fields. `today` is used when the model gave no usable date.
    pub fn into_expense(self, today: NaiveDate) -> Result<Expense, ExtractionError> {
        let amount = self.amount.ok_or(ExtractionError::MissingAmount)?;
        if amount.is_negative() {
            return Err(ExtractionError::NegativeAmount(amount));
        }
        let category = self
            .category
            .as_deref()
            .map(Category::from_label)
            .unwrap_or_default();
        let date = match self.date.as_deref().map(str::trim) {
            None | Some("") => today,
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|e| {
                warn!("Using today's date instead of the unparseable date '{s}': {e}");
                today
            }),
        };
        let description = self.description.unwrap_or_default().trim().to_string();
        let merchant = self
            .merchant
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        Ok(Expense::new(date, amount, category, description, merchant))
    }
}

/// A text message of the form `<description> $<amount>`, e.g. `Lunch $15.50`. When a message has
/// this shape, the number the user typed is the amount that gets logged.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct LiteralExpense {
    pub(crate) description: String,
    pub(crate) amount: Amount,
}

impl LiteralExpense {
    pub(crate) fn parse(text: &str) -> Option<Self> {
        let (description, amount) = text.trim().rsplit_once('$')?;
        let description = description.trim();
        let amount = amount.trim();
        if description.is_empty() || amount.is_empty() {
            return None;
        }
        if !amount.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
            return None;
        }
        let value = Decimal::from_str(&amount.replace(',', "")).ok()?;
        Some(Self {
            description: description.to_string(),
            amount: Amount::new(value),
        })
    }

    /// Overrides the model's amount with the literal one, and fills in the description if the
    /// model left it empty.
    pub(crate) fn apply(&self, expense: &mut Expense) {
        if expense.amount().value() != self.amount.value() {
            warn!(
                "Replacing the extracted amount {} with the amount typed by the user {}",
                expense.amount(),
                self.amount
            );
            expense.set_amount(self.amount);
        }
        if expense.description().is_empty() {
            expense.set_description(self.description.clone());
        }
    }
}

/// The instructions sent to the model along with the text or image.
pub fn extraction_prompt() -> String {
    let schema = serde_json::to_string_pretty(&schemars::schema_for!(ExtractedExpense))
        .unwrap_or_default();
    let categories = Category::ALL
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Analyze this receipt or expense and extract the following information as a single JSON \
        object matching this JSON schema:\n\n{schema}\n\n\
        The category must be one of: {categories}.\n\
        The amount is a plain number (no currency symbol).\n\
        If the date is not clear, leave it out.\n\
        If this is not a valid expense or receipt, return: {{\"error\": \"Not a valid expense\"}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 20).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_plain_json() {
        let reply = r#"{"amount": 15.5, "category": "food", "description": "Lunch",
            "date": "2025-10-19", "merchant": "Chipotle"}"#;
        let expense = parse_reply(reply).unwrap().into_expense(today()).unwrap();
        assert_eq!(expense.amount().value(), dec("15.5"));
        assert_eq!(expense.category(), Category::Food);
        assert_eq!(expense.description(), "Lunch");
        assert_eq!(expense.date(), NaiveDate::from_ymd_opt(2025, 10, 19).unwrap());
        assert_eq!(expense.merchant(), Some("Chipotle"));
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "```json\n{\"amount\": \"$40\", \"category\": \"Transport\"}\n```";
        let expense = parse_reply(reply).unwrap().into_expense(today()).unwrap();
        assert_eq!(expense.amount().value(), dec("40"));
        assert_eq!(expense.category(), Category::Transport);
        assert_eq!(expense.date(), today());
        assert_eq!(expense.merchant(), None);
    }

    #[test]
    fn test_parse_rejection() {
        let err = parse_reply(r#"{"error": "Not a valid expense"}"#).unwrap_err();
        assert_eq!(err, ExtractionError::Rejected("Not a valid expense".to_string()));
        assert_eq!(err.user_message(), "Not a valid expense");
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_reply("I could not read that receipt."),
            Err(ExtractionError::Unparseable(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"amount": "a lot"}"#),
            Err(ExtractionError::Unparseable(_))
        ));
    }

    #[test]
    fn test_missing_amount() {
        let extracted = parse_reply(r#"{"category": "food", "description": "Lunch"}"#).unwrap();
        assert_eq!(
            extracted.into_expense(today()).unwrap_err(),
            ExtractionError::MissingAmount
        );
    }

    #[test]
    fn test_negative_amount() {
        let extracted = parse_reply(r#"{"amount": -3}"#).unwrap();
        assert!(matches!(
            extracted.into_expense(today()),
            Err(ExtractionError::NegativeAmount(_))
        ));
    }

    #[test]
    fn test_unknown_category_and_bad_date() {
        let extracted =
            parse_reply(r#"{"amount": 3, "category": "pets", "date": "yesterday"}"#).unwrap();
        let expense = extracted.into_expense(today()).unwrap();
        assert_eq!(expense.category(), Category::Other);
        assert_eq!(expense.date(), today());
    }

    #[test]
    fn test_blank_merchant_is_none() {
        let extracted = parse_reply(r#"{"amount": 3, "merchant": "  "}"#).unwrap();
        assert_eq!(extracted.into_expense(today()).unwrap().merchant(), None);
    }

    #[test]
    fn test_literal_expense() {
        let literal = LiteralExpense::parse("Lunch $15.50").unwrap();
        assert_eq!(literal.description, "Lunch");
        assert_eq!(literal.amount.value(), dec("15.50"));

        let literal = LiteralExpense::parse("  Train ticket to Boston $1,204.99 ").unwrap();
        assert_eq!(literal.description, "Train ticket to Boston");
        assert_eq!(literal.amount.value(), dec("1204.99"));
    }

    #[test]
    fn test_literal_expense_no_match() {
        assert_eq!(LiteralExpense::parse("spent 15 on lunch"), None);
        assert_eq!(LiteralExpense::parse("$15"), None);
        assert_eq!(LiteralExpense::parse("Lunch $"), None);
        assert_eq!(LiteralExpense::parse("Lunch $15 with Sam"), None);
    }

    #[test]
    fn test_literal_expense_apply() {
        let mut expense = parse_reply(r#"{"amount": 16, "category": "food"}"#)
            .unwrap()
            .into_expense(today())
            .unwrap();
        LiteralExpense::parse("Lunch $15.50")
            .unwrap()
            .apply(&mut expense);
        assert_eq!(expense.amount().value(), dec("15.50"));
        assert_eq!(expense.description(), "Lunch");
    }

    #[test]
    fn test_prompt_mentions_schema_and_categories() {
        let prompt = extraction_prompt();
        assert!(prompt.contains("\"amount\""));
        assert!(prompt.contains("\"merchant\""));
        assert!(prompt.contains("healthcare"));
        assert!(prompt.contains("Not a valid expense"));
    }
}
