//! Alaska Airlines award availability monitor.
//!
//! Runs one award search per target arrival station and scans the result
//! matrix rows for points pricing. A station that fails to load is logged
//! and skipped; the remaining stations still produce rows.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use pricewatch_core::config::AlaskaAwardConfig;
use pricewatch_core::{Record, Result, Scraper, Value};

use crate::fetch;

const ROW_MARKER: &str = "matrix-row";

static POINTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d,]+(?:\.\d+)?)\s*([kK])?").unwrap());
static AWARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\d,]+(?:\.\d+)?\s*(?:[kK]\b|[kK]?\s*(?:pts|points))").unwrap()
});
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\s*([\d,]+)").unwrap());
static FLIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:AS|Flight)\s*#?\s*(\d+)").unwrap());
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}:\d{2}\s*(?:[ap]m|[AP]M)").unwrap());

pub struct AlaskaAwardScraper {
    config: AlaskaAwardConfig,
}

impl AlaskaAwardScraper {
    pub fn new(config: AlaskaAwardConfig) -> Self {
        Self { config }
    }

    fn search_url(&self, arrival: &str) -> String {
        self.config
            .base_search_url
            .replace("{departure}", &self.config.departure_station)
            .replace("{arrival}", arrival)
            .replace("{date}", &self.config.search_date)
    }

    fn matches_alert(&self, record: &Record) -> bool {
        let station_ok = record
            .text("Arrival Station")
            .is_some_and(|s| self.config.target_arrival_stations.iter().any(|t| t == s));
        station_ok
            && record
                .number("Points")
                .is_some_and(|p| p <= self.config.target_points as f64)
    }
}

#[async_trait]
impl Scraper for AlaskaAwardScraper {
    fn name(&self) -> &str {
        "alaska_award"
    }

    fn url(&self) -> String {
        let first = self
            .config
            .target_arrival_stations
            .first()
            .map(String::as_str)
            .unwrap_or("LAX");
        self.search_url(first)
    }

    async fn scrape(&self, client: &reqwest::Client) -> Result<Vec<Record>> {
        let mut all_rows = Vec::new();

        for arrival in &self.config.target_arrival_stations {
            let url = self.search_url(arrival);
            tracing::info!(
                "🔎 Searching {} → {}",
                self.config.departure_station,
                arrival
            );
            match fetch::get_text(client, &url).await {
                Ok(html) => {
                    let rows =
                        parse_matrix(&html, &self.config.departure_station, arrival);
                    tracing::info!("Found {} flight(s) for {}", rows.len(), arrival);
                    all_rows.extend(rows);
                }
                Err(e) => {
                    tracing::warn!("Search for {arrival} failed, skipping: {e}");
                }
            }
        }

        Ok(all_rows)
    }

    fn alert_condition(&self, records: &[Record]) -> bool {
        records.iter().any(|r| self.matches_alert(r))
    }

    fn alert_subject(&self) -> String {
        format!(
            "Alaska Airlines Alert: {}k Points Available for {} → {}",
            self.config.target_points as f64 / 1000.0,
            self.config.departure_station,
            self.config.target_arrival_stations.join("/")
        )
    }

    fn alert_body(&self, records: &[Record]) -> String {
        let flagged: Vec<Record> = records
            .iter()
            .map(|r| {
                let mark = if self.matches_alert(r) { "✅" } else { "" };
                let mut row = Record::new().push("Alert", Value::Text(mark.into()));
                for (column, value) in r.iter() {
                    row = row.push(column, value.clone());
                }
                row
            })
            .collect();

        let table = pricewatch_alert::render_table(&flagged);
        pricewatch_alert::html_body(
            "Alaska Airlines Award Ticket Alert",
            &format!(
                "Found flights at or below {} points for {} → {}. Matching flights are marked.",
                self.config.target_points,
                self.config.departure_station,
                self.config.target_arrival_stations.join("/")
            ),
            &table,
            Some(&self.url()),
        )
    }
}

/// Parse an award amount like `7.5k`, `12,500 pts`, or `7500`.
pub fn parse_points(raw: &str) -> Option<f64> {
    let caps = POINTS_RE.captures(raw.trim())?;
    let number: f64 = caps[1].replace(',', "").parse().ok()?;
    if caps.get(2).is_some() {
        Some(number * 1000.0)
    } else {
        Some(number)
    }
}

/// Extract flight rows from the award search result matrix.
pub fn parse_matrix(html: &str, departure: &str, arrival: &str) -> Vec<Record> {
    let mut starts: Vec<usize> = html.match_indices(ROW_MARKER).map(|(i, _)| i).collect();
    starts.push(html.len());

    let mut records = Vec::new();
    for pair in starts.windows(2) {
        let block = &html[pair[0]..pair[1]];

        // A row without an award amount is an ad or a sold-out placeholder.
        // The amount must carry a `k` or `pts` marker so times and cash
        // prices in the same row never masquerade as points.
        let Some(points) = AWARD_RE
            .find(block)
            .and_then(|m| parse_points(m.as_str()))
        else {
            continue;
        };

        let price = PRICE_RE
            .captures(block)
            .map(|c| format!("${}", &c[1]))
            .unwrap_or_else(|| "N/A".into());
        let flight_number = FLIGHT_RE
            .captures(block)
            .map(|c| format!("AS {}", &c[1]))
            .unwrap_or_else(|| "N/A".into());

        let mut times = TIME_RE.find_iter(block).map(|m| m.as_str().to_string());
        let departure_time = times.next().unwrap_or_else(|| "N/A".into());
        let arrival_time = times.next().unwrap_or_else(|| "N/A".into());

        records.push(
            Record::new()
                .push("Departure Station", Value::Text(departure.to_string()))
                .push("Arrival Station", Value::Text(arrival.to_string()))
                .push("Departure Time", Value::Text(departure_time))
                .push("Arrival Time", Value::Text(arrival_time))
                .push("Points", Value::Number(points))
                .push("Price (USD)", Value::Text(price))
                .push("Flight Number", Value::Text(flight_number)),
        );
    }

    records
}
