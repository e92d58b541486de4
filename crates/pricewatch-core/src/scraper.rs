//! Capability traits the scheduler and alert pipeline are wired through.
//!
//! [`Scraper`] is the per-site contract: given its configuration, produce
//! zero or more structured records, or fail. [`Runnable`] is the narrower
//! seam the scheduler depends on; it knows nothing about records, alert
//! conditions, or email.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Record;

/// One monitored site: fetch, extract, and decide whether to alert.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Registry key, also used in run records and log lines.
    fn name(&self) -> &str;

    /// The page or endpoint this monitor targets (also the booking link
    /// embedded in alert emails).
    fn url(&self) -> String;

    /// Fetch and extract. An empty vec is a successful run with no data.
    async fn scrape(&self, client: &reqwest::Client) -> Result<Vec<Record>>;

    /// Whether the scraped rows warrant an alert email.
    fn alert_condition(&self, records: &[Record]) -> bool;

    fn alert_subject(&self) -> String;

    /// HTML email body for the given rows.
    fn alert_body(&self, records: &[Record]) -> String;
}

/// A schedulable unit of work. The scheduler core depends only on this.
#[async_trait]
pub trait Runnable: Send + Sync {
    fn name(&self) -> &str;

    /// One complete execution attempt. Errors are absorbed at the runner
    /// boundary and recorded; they never reach sibling tasks.
    async fn run(&self) -> Result<()>;
}
