//! The scrape → check → alert pipeline behind the scheduler's job seam.

use async_trait::async_trait;

use pricewatch_alert::AlertMailer;
use pricewatch_core::{Result, Runnable, Scraper};

/// One configured monitor, ready to run: a scraper, its HTTP client, and
/// the alert mailer. This is what the registry hands the scheduler.
pub struct ScraperJob {
    scraper: Box<dyn Scraper>,
    client: reqwest::Client,
    mailer: AlertMailer,
}

impl ScraperJob {
    pub fn new(scraper: Box<dyn Scraper>, client: reqwest::Client, mailer: AlertMailer) -> Self {
        Self {
            scraper,
            client,
            mailer,
        }
    }
}

#[async_trait]
impl Runnable for ScraperJob {
    fn name(&self) -> &str {
        self.scraper.name()
    }

    async fn run(&self) -> Result<()> {
        let records = self.scraper.scrape(&self.client).await?;

        if records.is_empty() {
            tracing::info!("[{}] no data scraped", self.scraper.name());
            return Ok(());
        }
        tracing::info!("[{}] scraped {} row(s)", self.scraper.name(), records.len());

        if self.scraper.alert_condition(&records) {
            let subject = self.scraper.alert_subject();
            let body = self.scraper.alert_body(&records);
            self.mailer.send(&subject, &body).await?;
        } else {
            tracing::info!("[{}] no alert condition met", self.scraper.name());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricewatch_core::config::{EmailConfig, HttpConfig};
    use pricewatch_core::{PricewatchError, Record, Value};

    struct StubScraper {
        rows: Vec<Record>,
        alert: bool,
    }

    #[async_trait]
    impl Scraper for StubScraper {
        fn name(&self) -> &str {
            "stub"
        }
        fn url(&self) -> String {
            "https://example.com".into()
        }
        async fn scrape(&self, _client: &reqwest::Client) -> Result<Vec<Record>> {
            Ok(self.rows.clone())
        }
        fn alert_condition(&self, _records: &[Record]) -> bool {
            self.alert
        }
        fn alert_subject(&self) -> String {
            "stub alert".into()
        }
        fn alert_body(&self, _records: &[Record]) -> String {
            "<html></html>".into()
        }
    }

    fn job(rows: Vec<Record>, alert: bool) -> ScraperJob {
        ScraperJob::new(
            Box::new(StubScraper { rows, alert }),
            crate::fetch::build_client(&HttpConfig::default()).unwrap(),
            AlertMailer::new(EmailConfig::default()),
        )
    }

    fn one_row() -> Vec<Record> {
        vec![Record::new().push("Price", Value::Number(1.0))]
    }

    #[tokio::test]
    async fn test_no_data_is_success() {
        assert!(job(vec![], false).run().await.is_ok());
    }

    #[tokio::test]
    async fn test_no_alert_condition_is_success() {
        // Mailer is unconfigured; the run still succeeds because no alert
        // delivery is attempted.
        assert!(job(one_row(), false).run().await.is_ok());
    }

    #[tokio::test]
    async fn test_alert_with_unconfigured_mailer_fails() {
        let err = job(one_row(), true).run().await.unwrap_err();
        assert!(matches!(err, PricewatchError::Config(_)));
    }
}
