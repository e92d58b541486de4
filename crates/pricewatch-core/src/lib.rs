//! # Pricewatch Core
//!
//! Shared foundation for the pricewatch workspace: configuration,
//! the error taxonomy, the tabular record model produced by site
//! monitors, and the capability traits the rest of the system is
//! wired through.

pub mod config;
pub mod error;
pub mod scraper;
pub mod types;

pub use config::PricewatchConfig;
pub use error::{PricewatchError, Result};
pub use scraper::{Runnable, Scraper};
pub use types::{Record, Value};
