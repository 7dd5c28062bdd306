//! A Telegram bot that extracts expenses from text and receipt photos with Gemini and logs them to
//! a Google Sheet.

pub mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod handler;
pub mod model;
mod receipt;
mod reply;
pub mod server;
mod utils;

#[cfg(test)]
mod test;

pub use api::Mode;
pub use config::Config;
pub use error::{Error, ErrorType, Result};
