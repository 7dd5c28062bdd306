//! Implements the `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets.

use crate::api::{Sheet, SheetRange, EXPENSES, MONTHLY_TOTALS};
use crate::error::Res;
use crate::model::Cell;
use anyhow::{anyhow, bail, Context};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};

type Tabs = BTreeMap<String, Vec<Vec<String>>>;

/// An implementation of the `Sheet` trait that does not use Google sheets. Clones share the same
/// data, so a test can keep a clone to inspect what the code under test wrote.
#[derive(Debug, Clone, Default)]
pub(crate) struct TestSheet {
    data: Arc<Mutex<Tabs>>,
}

impl TestSheet {
    /// Create a new `TestSheet` using `data`. The map key is the tab name and the map value is the
    /// rows of the tab.
    pub(crate) fn new(data: Tabs) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Create a `TestSheet` with both tabs and some expenses from October 2025.
    pub(crate) fn seeded() -> Res<Self> {
        let mut map = Tabs::new();
        map.insert(EXPENSES.to_string(), load_csv(EXPENSE_DATA)?);
        map.insert(MONTHLY_TOTALS.to_string(), load_csv(MONTHLY_DATA)?);
        Ok(Self::new(map))
    }

    /// Create a `TestSheet` with the seeded Expenses tab and no Monthly_Totals tab.
    #[cfg(test)]
    pub(crate) fn expenses_only() -> Res<Self> {
        let mut map = Tabs::new();
        map.insert(EXPENSES.to_string(), load_csv(EXPENSE_DATA)?);
        Ok(Self::new(map))
    }

    /// A copy of the rows of a tab, or `None` if there is no such tab.
    #[cfg(test)]
    pub(crate) fn rows(&self, sheet_name: &str) -> Option<Vec<Vec<String>>> {
        self.lock().ok()?.get(sheet_name).cloned()
    }

    fn lock(&self) -> Res<MutexGuard<'_, Tabs>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("The test sheet mutex is poisoned"))
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn sheet_names(&self) -> Res<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    async fn add_sheets(&self, names: &[&str]) -> Res<()> {
        let mut data = self.lock()?;
        for name in names {
            if data.contains_key(*name) {
                bail!("A sheet with the name \"{name}\" already exists");
            }
            data.insert(name.to_string(), Vec::new());
        }
        Ok(())
    }

    async fn get(&self, sheet_name: &str) -> Res<Vec<Vec<String>>> {
        self.lock()?
            .get(sheet_name)
            .with_context(|| format!("Sheet '{sheet_name}' not found"))
            .cloned()
    }

    async fn write_ranges(&self, ranges: &[SheetRange]) -> Res<()> {
        let mut data = self.lock()?;
        for sheet_range in ranges {
            let (sheet_name, start_row, start_col) = parse_a1(&sheet_range.range)?;
            let rows = data
                .get_mut(sheet_name)
                .with_context(|| format!("Sheet '{sheet_name}' not found"))?;
            for (row_offset, values) in sheet_range.values.iter().enumerate() {
                let row_ix = start_row + row_offset;
                if rows.len() <= row_ix {
                    rows.resize(row_ix + 1, Vec::new());
                }
                let row = &mut rows[row_ix];
                for (col_offset, value) in values.iter().enumerate() {
                    let col_ix = start_col + col_offset;
                    if row.len() <= col_ix {
                        row.resize(col_ix + 1, String::new());
                    }
                    row[col_ix] = value.to_string();
                }
            }
        }
        Ok(())
    }

    async fn append(&self, sheet_name: &str, new_rows: &[Vec<Cell>]) -> Res<()> {
        let mut data = self.lock()?;
        let rows = data
            .get_mut(sheet_name)
            .with_context(|| format!("Sheet '{sheet_name}' not found"))?;
        rows.extend(
            new_rows
                .iter()
                .map(|row| row.iter().map(Cell::to_string).collect::<Vec<_>>()),
        );
        Ok(())
    }
}

/// Parses the start of an A1 range such as `Monthly_Totals!A3:I3` into the sheet name and the
/// zero-based row and column of its first cell.
fn parse_a1(range: &str) -> Res<(&str, usize, usize)> {
    let (sheet_name, cells) = range
        .split_once('!')
        .with_context(|| format!("Range '{range}' has no sheet name"))?;
    let start = cells.split(':').next().unwrap_or(cells);
    let letters: String = start.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let digits = &start[letters.len()..];
    if letters.is_empty() || digits.is_empty() {
        bail!("Range '{range}' does not start with a cell like A1");
    }
    let col = letters
        .to_ascii_uppercase()
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
        - 1;
    let row: usize = digits
        .parse()
        .with_context(|| format!("Invalid row number in range '{range}'"))?;
    if row == 0 {
        bail!("Row numbers start at 1 in range '{range}'");
    }
    Ok((sheet_name, row - 1, col))
}

/// Loads data from a CSV-formatted string.
fn load_csv(csv_data: &str) -> Res<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false) // Ensure headers are treated as part of the data
        .flexible(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(rows)
}

/// Seed expense data.
const EXPENSE_DATA: &str = r##"Date,Amount,Category,Description,Merchant,Month
2025-09-28,42.10,food,Groceries,Safeway,2025-09
2025-10-02,9.75,food,Burger,In-N-Out Burger,2025-10
2025-10-08,55.20,transport,Gas,76 Gas Station,2025-10
2025-10-16,142.67,utilities,Electric bill,PG&E,2025-10
"##;

/// Seed monthly totals data.
const MONTHLY_DATA: &str = r##"Month,Total_Amount,Food,Transport,Utilities,Shopping,Entertainment,Healthcare,Other
2025-09,42.10,42.10,0.00,0.00,0.00,0.00,0.00,0.00
2025-10,207.62,9.75,55.20,142.67,0.00,0.00,0.00,0.00
"##;

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|s| Cell::from(*s)).collect()
    }

    #[test]
    fn test_parse_a1() {
        assert_eq!(parse_a1("Expenses!A1:F1").unwrap(), ("Expenses", 0, 0));
        assert_eq!(
            parse_a1("Monthly_Totals!B12:I12").unwrap(),
            ("Monthly_Totals", 11, 1)
        );
        assert_eq!(parse_a1("X!AA3").unwrap(), ("X", 2, 26));
        assert!(parse_a1("A1:B2").is_err());
        assert!(parse_a1("X!A:F").is_err());
        assert!(parse_a1("X!A0").is_err());
    }

    #[tokio::test]
    async fn test_seeded() {
        let sheet = TestSheet::seeded().unwrap();
        assert_eq!(
            sheet.sheet_names().await.unwrap(),
            vec![EXPENSES.to_string(), MONTHLY_TOTALS.to_string()]
        );
        assert_eq!(sheet.get(EXPENSES).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_write_ranges_grows_rows() {
        let sheet = TestSheet::default();
        sheet.add_sheets(&["T"]).await.unwrap();
        sheet
            .write_ranges(&[SheetRange::new("T!B2:C2", vec![row(&["x", "y"])])])
            .await
            .unwrap();
        assert_eq!(
            sheet.rows("T").unwrap(),
            vec![Vec::<String>::new(), vec!["".to_string(), "x".to_string(), "y".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_append_and_clones_share_data() {
        let sheet = TestSheet::default();
        let observer = sheet.clone();
        sheet.add_sheets(&["T"]).await.unwrap();
        sheet.append("T", &[row(&["a"]), row(&["b"])]).await.unwrap();
        assert_eq!(observer.rows("T").unwrap().len(), 2);
        assert!(sheet.append("Missing", &[row(&["a"])]).await.is_err());
    }

    #[tokio::test]
    async fn test_add_existing_sheet_fails() {
        let sheet = TestSheet::seeded().unwrap();
        assert!(sheet.add_sheets(&[EXPENSES]).await.is_err());
    }
}
