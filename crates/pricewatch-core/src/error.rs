//! Error taxonomy shared across the workspace.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PricewatchError>;

/// Workspace-wide error type.
///
/// Failures crossing the task-runner boundary (network, parse, missing
/// data, delivery) are recorded and never terminate the scheduler; only
/// `Server` errors at startup are fatal to the process.
#[derive(Debug, Error)]
pub enum PricewatchError {
    #[error("config error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("scrape error: {0}")]
    Scrape(String),

    #[error("alert delivery error: {0}")]
    Alert(String),

    #[error("unknown scraper: {0}")]
    UnknownScraper(String),

    #[error("health server error: {0}")]
    Server(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
