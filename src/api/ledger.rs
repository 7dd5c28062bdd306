//! The `Ledger` owns the two tabs of the expense spreadsheet.

use crate::api::{Sheet, SheetRange, EXPENSES, MONTHLY_TOTALS};
use crate::error::Res;
use crate::model::{Cell, Expense, Month, MonthlyTotals, EXPENSE_HEADERS, MONTHLY_HEADERS};
use anyhow::Context;
use tracing::{debug, error, info};

/// Reads and writes expenses and monthly totals using a dynamically-dispatched `Sheet`.
pub struct Ledger {
    sheet: Box<dyn Sheet>,
}

impl Ledger {
    pub(crate) fn new(sheet: Box<dyn Sheet>) -> Self {
        Self { sheet }
    }

    /// Makes sure both tabs exist and have their header rows. Tabs that already exist are left in
    /// place, so this can be called any number of times.
    pub async fn setup(&self) -> Res<()> {
        let existing = self
            .sheet
            .sheet_names()
            .await
            .context("Unable to list the tabs of the spreadsheet")?;
        let missing: Vec<&str> = [EXPENSES, MONTHLY_TOTALS]
            .into_iter()
            .filter(|name| !existing.iter().any(|e| e == name))
            .collect();
        if !missing.is_empty() {
            info!("Adding tabs {missing:?}");
            self.sheet
                .add_sheets(&missing)
                .await
                .context("Unable to add the missing tabs")?;
        }

        self.sheet
            .write_ranges(&[
                SheetRange::new(
                    format!("{EXPENSES}!A1:F1"),
                    vec![EXPENSE_HEADERS.iter().map(|s| Cell::from(*s)).collect()],
                ),
                SheetRange::new(
                    format!("{MONTHLY_TOTALS}!A1:I1"),
                    vec![MONTHLY_HEADERS.iter().map(|s| Cell::from(*s)).collect()],
                ),
            ])
            .await
            .context("Unable to write the header rows")?;
        Ok(())
    }

    /// Appends `expense` to the `Expenses` tab and then brings its month's row in the
    /// `Monthly_Totals` tab up to date.
    ///
    /// Once the append has succeeded the expense is logged, so a failure to update the totals is
    /// only reported in the log. The totals are rebuilt from scratch on the next write to the same
    /// month.
    pub async fn log_expense(&self, expense: &Expense) -> Res<()> {
        self.sheet
            .append(EXPENSES, &[expense.to_row()])
            .await
            .context("Unable to append the expense")?;
        debug!("Appended {} {} expense", expense.amount(), expense.category());

        if let Err(e) = self.update_monthly_totals(expense.month()).await {
            error!(
                "The expense was logged but the totals for {} were not updated: {e:#}",
                expense.month()
            );
        }
        Ok(())
    }

    /// Recomputes the totals for `month` from all of its expenses and writes them to that month's
    /// row, adding the row if the month has none yet.
    ///
    /// The read-then-write is not atomic. Two concurrent first writes to a new month can both find
    /// no row and both append one. Later writes then update, and `monthly_summary` reads, the first
    /// of those rows, so the month self-corrects on its next expense while the extra row stays
    /// stale.
    pub async fn update_monthly_totals(&self, month: Month) -> Res<MonthlyTotals> {
        let expenses = self
            .sheet
            .get(EXPENSES)
            .await
            .context("Unable to read the expenses")?;
        let totals = MonthlyTotals::from_expense_rows(month, &expenses);

        let monthly = self
            .sheet
            .get(MONTHLY_TOTALS)
            .await
            .context("Unable to read the monthly totals")?;
        let key = month.to_string();
        let existing_row = monthly
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| row.first().map(|m| m.trim()) == Some(key.as_str()))
            .map(|(ix, _)| ix + 1);

        match existing_row {
            Some(row_number) => {
                debug!("Updating the {month} totals in row {row_number}");
                self.sheet
                    .write_ranges(&[SheetRange::new(
                        format!("{MONTHLY_TOTALS}!A{row_number}:I{row_number}"),
                        vec![totals.to_row()],
                    )])
                    .await
                    .context("Unable to update the monthly totals")?;
            }
            None => {
                debug!("Adding a row for the {month} totals");
                self.sheet
                    .append(MONTHLY_TOTALS, &[totals.to_row()])
                    .await
                    .context("Unable to append the monthly totals")?;
            }
        }
        Ok(totals)
    }

    /// Reads the totals for `month`. A month without a row has zero totals.
    pub async fn monthly_summary(&self, month: Month) -> Res<MonthlyTotals> {
        let rows = self
            .sheet
            .get(MONTHLY_TOTALS)
            .await
            .context("Unable to read the monthly totals")?;
        let key = month.to_string();
        match rows
            .iter()
            .skip(1)
            .find(|row| row.first().map(|m| m.trim()) == Some(key.as_str()))
        {
            Some(row) => MonthlyTotals::from_row(row),
            None => Ok(MonthlyTotals::empty(month)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSheet;
    use crate::model::{Amount, Category};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn expense(date: (i32, u32, u32), amount: &str, category: Category) -> Expense {
        Expense::new(
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            Amount::from_str(amount).unwrap(),
            category,
            "something",
            None,
        )
    }

    fn october() -> Month {
        Month::new(2025, 10).unwrap()
    }

    #[tokio::test]
    async fn test_setup_creates_tabs_and_headers() {
        let sheet = TestSheet::default();
        let ledger = Ledger::new(Box::new(sheet.clone()));
        ledger.setup().await.unwrap();
        assert_eq!(sheet.rows(EXPENSES).unwrap()[0], EXPENSE_HEADERS.to_vec());
        assert_eq!(sheet.rows(MONTHLY_TOTALS).unwrap()[0], MONTHLY_HEADERS.to_vec());
    }

    #[tokio::test]
    async fn test_setup_is_idempotent() {
        let sheet = TestSheet::default();
        let ledger = Ledger::new(Box::new(sheet.clone()));
        ledger.setup().await.unwrap();
        let names_once = sheet.sheet_names().await.unwrap();
        let expenses_once = sheet.rows(EXPENSES).unwrap();
        let monthly_once = sheet.rows(MONTHLY_TOTALS).unwrap();

        ledger.setup().await.unwrap();
        assert_eq!(sheet.sheet_names().await.unwrap(), names_once);
        assert_eq!(names_once.len(), 2);
        assert_eq!(sheet.rows(EXPENSES).unwrap(), expenses_once);
        assert_eq!(sheet.rows(MONTHLY_TOTALS).unwrap(), monthly_once);
    }

    #[tokio::test]
    async fn test_setup_keeps_existing_data() {
        let sheet = TestSheet::seeded().unwrap();
        let ledger = Ledger::new(Box::new(sheet.clone()));
        ledger.setup().await.unwrap();
        assert_eq!(sheet.rows(EXPENSES).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_log_expense_updates_existing_month_in_place() {
        let sheet = TestSheet::seeded().unwrap();
        let ledger = Ledger::new(Box::new(sheet.clone()));
        ledger
            .log_expense(&expense((2025, 10, 20), "15.50", Category::Food))
            .await
            .unwrap();

        let expenses = sheet.rows(EXPENSES).unwrap();
        assert_eq!(expenses.len(), 6);
        assert_eq!(expenses[5][1], "15.50");

        let monthly = sheet.rows(MONTHLY_TOTALS).unwrap();
        assert_eq!(monthly.len(), 3);
        assert_eq!(monthly[2][0], "2025-10");
        assert_eq!(monthly[2][1], "223.12");
        assert_eq!(monthly[2][2], "25.25");
        // September is untouched
        assert_eq!(monthly[1][1], "42.10");
    }

    #[tokio::test]
    async fn test_log_expense_adds_new_month() {
        let sheet = TestSheet::seeded().unwrap();
        let ledger = Ledger::new(Box::new(sheet.clone()));
        ledger
            .log_expense(&expense((2025, 11, 1), "40", Category::Transport))
            .await
            .unwrap();
        let monthly = sheet.rows(MONTHLY_TOTALS).unwrap();
        assert_eq!(monthly.len(), 4);
        assert_eq!(monthly[3][0], "2025-11");
        assert_eq!(monthly[3][1], "40.00");
        assert_eq!(monthly[3][3], "40.00");
    }

    #[tokio::test]
    async fn test_log_expense_without_monthly_tab_still_logs() {
        let sheet = TestSheet::expenses_only().unwrap();
        let ledger = Ledger::new(Box::new(sheet.clone()));
        ledger
            .log_expense(&expense((2025, 10, 20), "15.50", Category::Food))
            .await
            .unwrap();
        let expenses = sheet.rows(EXPENSES).unwrap();
        assert_eq!(expenses.len(), 6);
        assert_eq!(expenses[5][1], "15.50");
        assert!(sheet.rows(MONTHLY_TOTALS).is_none());
        assert!(ledger.update_monthly_totals(october()).await.is_err());
    }

    #[tokio::test]
    async fn test_log_expense_without_tabs_fails() {
        let ledger = Ledger::new(Box::new(TestSheet::default()));
        let result = ledger
            .log_expense(&expense((2025, 10, 1), "1", Category::Other))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_summary_matches_sum_of_expenses() {
        let sheet = TestSheet::default();
        let ledger = Ledger::new(Box::new(sheet.clone()));
        ledger.setup().await.unwrap();
        let amounts = ["15.50", "40", "2.25", "100.01"];
        for (ix, amount) in amounts.iter().enumerate() {
            let category = Category::ALL[ix % Category::ALL.len()];
            ledger
                .log_expense(&expense((2025, 10, 1 + ix as u32), amount, category))
                .await
                .unwrap();
        }
        let summary = ledger.monthly_summary(october()).await.unwrap();
        let expected: Decimal = amounts.iter().map(|a| Decimal::from_str(a).unwrap()).sum();
        assert_eq!(summary.total().value(), expected);
        assert_eq!(
            summary.subtotal(Category::Food).value(),
            Decimal::from_str("15.50").unwrap()
        );
    }

    #[tokio::test]
    async fn test_summary_for_month_without_row() {
        let ledger = Ledger::new(Box::new(TestSheet::seeded().unwrap()));
        let summary = ledger
            .monthly_summary(Month::new(2024, 1).unwrap())
            .await
            .unwrap();
        assert!(summary.total().is_zero());
    }
}
