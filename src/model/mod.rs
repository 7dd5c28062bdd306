//! Types that represent the core data model, such as `Expense` and `MonthlyTotals`, and the typed
//! forms of the JSON that arrives from Telegram and from the AI model.
mod amount;
mod category;
mod cell;
mod expense;
mod extraction;
mod monthly;
mod update;

pub use amount::{Amount, AmountError, AmountFormat};
pub use category::Category;
pub use cell::Cell;
pub use expense::{Expense, EXPENSE_HEADERS};
pub use extraction::{extraction_prompt, parse_reply, ExtractedExpense, ExtractionError};
pub(crate) use extraction::LiteralExpense;
pub use monthly::{Month, MonthlyTotals, MONTHLY_HEADERS};
pub use update::{BotCommand, ImageSource, Inbound};
