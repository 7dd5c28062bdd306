use crate::model::{Amount, Category, Cell, Month};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The header row of the `Expenses` sheet.
pub const EXPENSE_HEADERS: [&str; 6] = [
    "Date",
    "Amount",
    "Category",
    "Description",
    "Merchant",
    "Month",
];

/// Index of the `Amount` column in the `Expenses` sheet.
pub(crate) const AMOUNT_COL: usize = 1;
/// Index of the `Category` column in the `Expenses` sheet.
pub(crate) const CATEGORY_COL: usize = 2;
/// Index of the `Month` column in the `Expenses` sheet.
pub(crate) const MONTH_COL: usize = 5;

/// One logged expense. Once written to the sheet it is never changed by this program.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Expense {
    date: NaiveDate,
    amount: Amount,
    category: Category,
    description: String,
    merchant: Option<String>,
}

impl Expense {
    pub fn new(
        date: NaiveDate,
        amount: Amount,
        category: Category,
        description: impl Into<String>,
        merchant: Option<String>,
    ) -> Self {
        Self {
            date,
            amount: amount.pretty(),
            category,
            description: description.into(),
            merchant,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn merchant(&self) -> Option<&str> {
        self.merchant.as_deref()
    }

    /// The month this expense is filed under, derived from its date.
    pub fn month(&self) -> Month {
        Month::of(self.date)
    }

    pub(crate) fn set_amount(&mut self, amount: Amount) {
        self.amount = amount.pretty();
    }

    pub(crate) fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// The row written to the `Expenses` sheet, in `EXPENSE_HEADERS` order.
    pub fn to_row(&self) -> Vec<Cell> {
        vec![
            self.date.format("%Y-%m-%d").to_string().into(),
            self.amount.into(),
            self.category.to_string().into(),
            self.description.as_str().into(),
            self.merchant.clone().unwrap_or_default().into(),
            self.month().to_string().into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_to_row() {
        let expense = Expense::new(
            NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
            Amount::new(Decimal::from_str("15.5").unwrap()),
            Category::Food,
            "Lunch",
            None,
        );
        let row: Vec<String> = expense.to_row().iter().map(Cell::to_string).collect();
        assert_eq!(row, vec!["2025-10-20", "15.50", "food", "Lunch", "", "2025-10"]);
        assert!(matches!(
            expense.to_row()[AMOUNT_COL],
            Cell::Number(a) if a.value() == Decimal::from_str("15.5").unwrap()
        ));
        assert_eq!(expense.to_row().len(), EXPENSE_HEADERS.len());
    }

    #[test]
    fn test_to_row_with_merchant() {
        let expense = Expense::new(
            NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            Amount::from_str("$1,040").unwrap(),
            Category::Transport,
            "Fuel",
            Some("Shell".to_string()),
        );
        let row: Vec<String> = expense.to_row().iter().map(Cell::to_string).collect();
        assert_eq!(row[AMOUNT_COL], "1040.00");
        assert_eq!(row[CATEGORY_COL], "transport");
        assert_eq!(row[4], "Shell");
        assert_eq!(row[MONTH_COL], "2025-01");
    }
}
