use clap::Parser;
use expense_bot::args::{Args, Command};
use expense_bot::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    // This allows for running the program without hitting the Google APIs. When
    // EXPENSE_BOT_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Google.
    let mode = Mode::from_env();
    let config = Config::load(args.common(), mode)?;
    debug!("{config:?}");

    let _: () = match args.command() {
        Command::Serve(serve_args) => commands::serve(config, serve_args).await?.print(),
        Command::Setup => commands::setup(config).await?.print(),
        Command::SetWebhook(webhook_args) => {
            commands::set_webhook(config, webhook_args.url())
                .await?
                .print()
        }
        Command::Summary(summary_args) => commands::summary(config, summary_args.month())
            .await?
            .print(),
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
