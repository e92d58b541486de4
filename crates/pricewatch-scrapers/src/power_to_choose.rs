//! Power to Choose electricity plan monitor.
//!
//! Pulls the plan listing for a zip code from the Power to Choose plan
//! API, filters by contract length, and keeps the cheapest plans at the
//! 1,000 kWh usage tier. Alerts when any kept plan is at or under the
//! configured ¢/kWh threshold.

use async_trait::async_trait;

use pricewatch_core::config::PowerToChooseConfig;
use pricewatch_core::{PricewatchError, Record, Result, Scraper, Value};

use crate::fetch;

const PLAN_API_URL: &str = "https://api.powertochoose.org/api/PowerToChoose/plans";
const SITE_URL: &str = "https://www.powertochoose.org/en-us";

pub struct PowerToChooseScraper {
    config: PowerToChooseConfig,
}

impl PowerToChooseScraper {
    pub fn new(config: PowerToChooseConfig) -> Self {
        Self { config }
    }

    fn api_url(&self) -> String {
        format!("{PLAN_API_URL}?zip_code={}", self.config.zip_code)
    }
}

#[async_trait]
impl Scraper for PowerToChooseScraper {
    fn name(&self) -> &str {
        "power_to_choose"
    }

    fn url(&self) -> String {
        SITE_URL.to_string()
    }

    async fn scrape(&self, client: &reqwest::Client) -> Result<Vec<Record>> {
        let payload = fetch::get_json(client, &self.api_url()).await?;
        parse_plans(&payload, &self.config)
    }

    fn alert_condition(&self, records: &[Record]) -> bool {
        records
            .iter()
            .filter_map(|r| r.number("Price 1,000 kWh"))
            .any(|price| price <= self.config.price_threshold_cents)
    }

    fn alert_subject(&self) -> String {
        "Power to Choose - Electricity Plan Alert".to_string()
    }

    fn alert_body(&self, records: &[Record]) -> String {
        let table = pricewatch_alert::render_table(records);
        pricewatch_alert::html_body(
            &format!(
                "A plan meeting your criteria (<= {}¢/kWh) was found.",
                self.config.price_threshold_cents
            ),
            &format!("Here are the top {} results:", records.len()),
            &table,
            Some(SITE_URL),
        )
    }
}

/// Extract plan rows from the API payload.
///
/// The listing sometimes arrives as a bare array and sometimes wrapped in
/// a `data` field; prices may be quoted in dollars (0.119) or cents (11.9)
/// per kWh depending on the feed revision.
fn parse_plans(payload: &serde_json::Value, config: &PowerToChooseConfig) -> Result<Vec<Record>> {
    let plans = payload
        .get("data")
        .and_then(|d| d.as_array())
        .or_else(|| payload.as_array())
        .ok_or_else(|| PricewatchError::Scrape("plan listing has no data array".into()))?;

    let mut rows: Vec<(f64, Record)> = Vec::new();
    for plan in plans {
        let term = plan
            .get("term_value")
            .and_then(number_field)
            .unwrap_or(0.0) as u32;
        if term < config.contract_min_months || term > config.contract_max_months {
            continue;
        }

        let Some(price_1000) = plan.get("price_kwh1000").and_then(number_field) else {
            continue;
        };
        let price_1000 = normalize_cents(price_1000);

        let price_500 = plan
            .get("price_kwh500")
            .and_then(number_field)
            .map(|p| format!("{:.1}¢", normalize_cents(p)))
            .unwrap_or_else(|| "N/A".into());
        let price_2000 = plan
            .get("price_kwh2000")
            .and_then(number_field)
            .map(|p| format!("{:.1}¢", normalize_cents(p)))
            .unwrap_or_else(|| "N/A".into());

        let cancel_fee = plan
            .get("cancel_fee")
            .map(|v| match v {
                serde_json::Value::String(s) if !s.is_empty() => s.clone(),
                serde_json::Value::Number(n) => format!("${n}"),
                _ => "N/A".into(),
            })
            .unwrap_or_else(|| "N/A".into());

        let fact_sheet = string_field(plan, "fact_sheet");
        let ordering = string_field(plan, "enroll_now")
            .or_else(|| string_field(plan, "website"));

        let mut record = Record::new()
            .push("Plan Length", Value::Text(format!("{term} Months")))
            .push("Price 1,000 kWh", Value::Number(price_1000))
            .push("Price 500 kWh", Value::Text(price_500))
            .push("Price 2,000 kWh", Value::Text(price_2000))
            .push("Cancellation Fee", Value::Text(cancel_fee));
        record = match fact_sheet {
            Some(url) => record.push("Fact Sheet", Value::Link(url)),
            None => record.push("Fact Sheet", Value::Text("N/A".into())),
        };
        record = match ordering {
            Some(url) => record.push("Ordering Info", Value::Link(url)),
            None => record.push("Ordering Info", Value::Text("N/A".into())),
        };

        rows.push((price_1000, record));
    }

    rows.sort_by(|a, b| a.0.total_cmp(&b.0));
    rows.truncate(config.max_results);
    Ok(rows.into_iter().map(|(_, record)| record).collect())
}

fn number_field(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_field(plan: &serde_json::Value, key: &str) -> Option<String> {
    plan.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Prices under 1.0 are dollars per kWh; everything else is already cents.
fn normalize_cents(price: f64) -> f64 {
    if price < 1.0 { price * 100.0 } else { price }
}
