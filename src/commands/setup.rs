use crate::api;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};

/// Creates the `Expenses` and `Monthly_Totals` tabs, if missing, and writes their header rows.
pub async fn setup(config: Config) -> Result<Out<()>> {
    let http = api::http_client().pub_result(ErrorType::Config)?;
    let ledger = api::ledger(&config, http).await?;
    ledger.setup().await.pub_result(ErrorType::Storage)?;
    Ok("Google Sheets setup completed".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Common;
    use crate::Mode;
    use tracing_subscriber::filter::LevelFilter;

    #[tokio::test]
    async fn test_setup_in_test_mode() {
        let common = Common::new(LevelFilter::INFO, None, None, None);
        let config = Config::load(&common, Mode::Test).unwrap();
        let out = setup(config).await.unwrap();
        assert_eq!(out.message(), "Google Sheets setup completed");
        assert!(out.structure().is_none());
    }
}
