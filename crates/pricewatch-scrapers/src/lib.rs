//! # Pricewatch Scrapers
//!
//! The site monitors and the task registry. Each monitor implements
//! [`pricewatch_core::Scraper`]: fetch a page or API endpoint, extract
//! tabular rows, and decide whether the rows warrant an alert. The
//! registry maps scraper names to ready-to-run jobs; the scheduler core
//! never sees a concrete scraper type.
//!
//! Extraction is deliberately contract-level: plain HTTP plus tolerant
//! scanning of known markup blocks, with the parsing kept in pure
//! functions testable against saved fixtures.

pub mod alaska_award;
pub mod fetch;
pub mod job;
pub mod power_to_choose;
pub mod registry;
pub mod villa_del_arco;

pub use job::ScraperJob;
pub use registry::{SCRAPER_NAMES, create_job, create_scraper};
