use crate::error::Res;
use crate::model::expense::{AMOUNT_COL, CATEGORY_COL, MONTH_COL};
use crate::model::{Amount, Category, Cell};
use anyhow::{bail, Context};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::warn;

/// The header row of the `Monthly_Totals` sheet.
pub const MONTHLY_HEADERS: [&str; 9] = [
    "Month",
    "Total_Amount",
    "Food",
    "Transport",
    "Utilities",
    "Shopping",
    "Entertainment",
    "Healthcare",
    "Other",
];

/// A calendar month, written as `YYYY-MM`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Res<Self> {
        if !(1..=12).contains(&month) {
            bail!("Month must be between 1 and 12, got {month}");
        }
        Ok(Self { year, month })
    }

    /// The month that `date` falls in.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The current month in local time.
    pub fn current() -> Self {
        Self::of(chrono::Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (year, month) = s
            .split_once('-')
            .with_context(|| format!("Expected a month formatted as YYYY-MM, got '{s}'"))?;
        let year = year
            .parse::<i32>()
            .with_context(|| format!("Invalid year in '{s}'"))?;
        let month = month
            .parse::<u32>()
            .with_context(|| format!("Invalid month in '{s}'"))?;
        Month::new(year, month)
    }
}

impl Serialize for Month {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Month::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// The monthly aggregate: the total of all expenses in a month, and the subtotal per category.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonthlyTotals {
    month: Month,
    total: Decimal,
    subtotals: [Decimal; 7],
}

impl MonthlyTotals {
    /// An aggregate with everything at zero.
    pub fn empty(month: Month) -> Self {
        Self {
            month,
            total: Decimal::ZERO,
            subtotals: [Decimal::ZERO; 7],
        }
    }

    /// Computes the aggregate for `month` from scratch using the rows of the `Expenses` sheet. The
    /// first row is the header and is skipped. Rows from other months, and short rows, are ignored.
    pub fn from_expense_rows(month: Month, rows: &[Vec<String>]) -> Self {
        let key = month.to_string();
        let mut totals = Self::empty(month);
        for (ix, row) in rows.iter().enumerate().skip(1) {
            if row.len() <= MONTH_COL || row[MONTH_COL].trim() != key {
                continue;
            }
            let amount = match Amount::from_str(&row[AMOUNT_COL]) {
                Ok(amount) => amount.value(),
                Err(e) => {
                    warn!(
                        "Treating unparseable amount '{}' in Expenses row {} as zero: {e}",
                        row[AMOUNT_COL],
                        ix + 1
                    );
                    Decimal::ZERO
                }
            };
            totals.add(Category::from_label(&row[CATEGORY_COL]), amount);
        }
        totals
    }

    /// Parses a row of the `Monthly_Totals` sheet. Missing or empty cells are zero.
    pub fn from_row(row: &[String]) -> Res<Self> {
        let month: Month = row
            .first()
            .context("A Monthly_Totals row is missing its Month cell")?
            .parse()?;
        let cell = |ix: usize| -> Res<Decimal> {
            match row.get(ix) {
                None => Ok(Decimal::ZERO),
                Some(s) => Amount::from_str(s).map(|a| a.value()).with_context(|| {
                    format!(
                        "Invalid {} value '{s}' for month {month}",
                        MONTHLY_HEADERS[ix]
                    )
                }),
            }
        };
        let mut subtotals = [Decimal::ZERO; 7];
        for (ix, subtotal) in subtotals.iter_mut().enumerate() {
            *subtotal = cell(ix + 2)?;
        }
        Ok(Self {
            month,
            total: cell(1)?,
            subtotals,
        })
    }

    /// The row written to the `Monthly_Totals` sheet, in `MONTHLY_HEADERS` order.
    pub fn to_row(&self) -> Vec<Cell> {
        let mut row = Vec::with_capacity(MONTHLY_HEADERS.len());
        row.push(Cell::Text(self.month.to_string()));
        row.push(Cell::Number(Amount::new(self.total)));
        row.extend(self.subtotals.iter().map(|d| Cell::Number(Amount::new(*d))));
        row
    }

    pub fn add(&mut self, category: Category, amount: Decimal) {
        self.total += amount;
        self.subtotals[category.index()] += amount;
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn total(&self) -> Amount {
        Amount::new(self.total)
    }

    pub fn subtotal(&self, category: Category) -> Amount {
        Amount::new(self.subtotals[category.index()])
    }
}
