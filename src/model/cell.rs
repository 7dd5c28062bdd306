use crate::model::Amount;
use rust_decimal::prelude::ToPrimitive;
use std::fmt::{Display, Formatter};

/// A value written to a spreadsheet cell.
///
/// Cells are written with the `RAW` input option, which stores strings verbatim. Amounts are sent
/// as JSON numbers so that the sheet holds them as numbers that can be summed, charted and sorted.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Cell {
    Text(String),
    Number(Amount),
}

impl Cell {
    /// The JSON value sent to the Sheets API for this cell.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Text(s) => serde_json::Value::String(s.clone()),
            Cell::Number(amount) => amount
                .value()
                .round_dp(2)
                .to_f64()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(amount.plain().to_string())),
        }
    }
}

/// Renders the cell the way the sheet shows it, with amounts as plain two-decimal numbers.
impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(amount) => write!(f, "{}", amount.plain()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<Amount> for Cell {
    fn from(amount: Amount) -> Self {
        Cell::Number(amount)
    }
}
