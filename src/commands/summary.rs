use crate::api;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Category, Month, MonthlyTotals};
use crate::{Config, Result};

/// Reads the totals for `month` from the `Monthly_Totals` tab.
pub async fn summary(config: Config, month: Month) -> Result<Out<MonthlyTotals>> {
    let http = api::http_client().pub_result(ErrorType::Config)?;
    let ledger = api::ledger(&config, http).await?;
    let totals = ledger
        .monthly_summary(month)
        .await
        .pub_result(ErrorType::Storage)?;
    Ok(Out::new(summary_message(&totals), totals))
}

fn summary_message(totals: &MonthlyTotals) -> String {
    let categories = Category::ALL
        .iter()
        .filter(|c| !totals.subtotal(**c).is_zero())
        .map(|c| format!("{c} {}", totals.subtotal(*c)))
        .collect::<Vec<_>>();
    if categories.is_empty() {
        return format!("No expenses in {}", totals.month());
    }
    format!(
        "Total for {}: {} ({})",
        totals.month(),
        totals.total(),
        categories.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Common;
    use crate::Mode;
    use tracing_subscriber::filter::LevelFilter;

    fn config() -> Config {
        Config::load(&Common::new(LevelFilter::INFO, None, None, None), Mode::Test).unwrap()
    }

    #[tokio::test]
    async fn test_summary_of_seeded_month() {
        let out = summary(config(), Month::new(2025, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(
            out.message(),
            "Total for 2025-10: $207.62 (food $9.75, transport $55.20, utilities $142.67)"
        );
        assert_eq!(out.structure().unwrap().total().to_string(), "$207.62");
    }

    #[tokio::test]
    async fn test_summary_of_empty_month() {
        let out = summary(config(), Month::new(2024, 2).unwrap())
            .await
            .unwrap();
        assert_eq!(out.message(), "No expenses in 2024-02");
    }
}
