//! Task registry — static mapping from scraper names to runnable jobs.

use pricewatch_alert::AlertMailer;
use pricewatch_core::{PricewatchConfig, PricewatchError, Result, Scraper};

use crate::alaska_award::AlaskaAwardScraper;
use crate::fetch;
use crate::job::ScraperJob;
use crate::power_to_choose::PowerToChooseScraper;
use crate::villa_del_arco::VillaDelArcoScraper;

/// All registered scraper names, in schedule order.
pub const SCRAPER_NAMES: [&str; 3] = ["power_to_choose", "villa_del_arco", "alaska_award"];

/// Construct a scraper by name. Pure lookup; no side effects.
pub fn create_scraper(name: &str, config: &PricewatchConfig) -> Result<Box<dyn Scraper>> {
    match name {
        "power_to_choose" => Ok(Box::new(PowerToChooseScraper::new(
            config.power_to_choose.clone(),
        ))),
        "villa_del_arco" => Ok(Box::new(VillaDelArcoScraper::new(
            config.villa_del_arco.clone(),
        ))),
        "alaska_award" => Ok(Box::new(AlaskaAwardScraper::new(
            config.alaska_award.clone(),
        ))),
        other => Err(PricewatchError::UnknownScraper(other.to_string())),
    }
}

/// Construct a ready-to-run job by name.
///
/// Callers in batch contexts treat a failure here as non-fatal (log and
/// skip); single-task callers treat it as fatal.
pub fn create_job(name: &str, config: &PricewatchConfig) -> Result<ScraperJob> {
    let scraper = create_scraper(name, config)?;
    let client = fetch::build_client(&config.http)?;
    let mailer = AlertMailer::new(config.email.clone());
    Ok(ScraperJob::new(scraper, client, mailer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricewatch_core::Runnable;

    #[test]
    fn test_all_registered_names_resolve() {
        let config = PricewatchConfig::default();
        for name in SCRAPER_NAMES {
            let scraper = create_scraper(name, &config).unwrap();
            assert_eq!(scraper.name(), name);
        }
    }

    #[test]
    fn test_unknown_scraper() {
        let err = create_scraper("crypto_floor", &PricewatchConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, PricewatchError::UnknownScraper(name) if name == "crypto_floor"));
    }

    #[test]
    fn test_job_carries_scraper_name() {
        let job = create_job("villa_del_arco", &PricewatchConfig::default()).unwrap();
        assert_eq!(job.name(), "villa_del_arco");
    }
}
