//! Villa del Arco hotel price monitor.
//!
//! Fetches the booking engine's availability page for a stay window and
//! scans the room/rate/board blocks for loyalty prices. Alerts when any
//! All Inclusive board comes in under the USD threshold.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use pricewatch_core::config::VillaDelArcoConfig;
use pricewatch_core::{Record, Result, Scraper, Value};

use crate::fetch;

const ROOM_MARKER: &str = "fn-room-item-container";
const RATE_MARKER: &str = "fn-accordion";
const BOARD_MARKER: &str = "fn-board";

static H3_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<h3[^>]*>(.*?)</h3>").unwrap());
static BOARD_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"TooltipNameStyles[^>]*>\s*([^<]+?)\s*<").unwrap());
static PRICE_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"fn-loyalty-locked-price"[^>]*>\s*([^<]+?)\s*<"#).unwrap()
});
static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\d,]+").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

pub struct VillaDelArcoScraper {
    config: VillaDelArcoConfig,
}

impl VillaDelArcoScraper {
    pub fn new(config: VillaDelArcoConfig) -> Self {
        Self { config }
    }

    fn matches_alert(&self, record: &Record) -> bool {
        record.text("Board Type") == Some("All Inclusive")
            && record
                .number("Price (USD)")
                .is_some_and(|p| p < self.config.price_threshold_usd as f64)
    }
}

#[async_trait]
impl Scraper for VillaDelArcoScraper {
    fn name(&self) -> &str {
        "villa_del_arco"
    }

    fn url(&self) -> String {
        self.config
            .base_url
            .replace("{check_in}", &self.config.check_in_date)
            .replace("{check_out}", &self.config.check_out_date)
            .replace("{adults}", &self.config.adults.to_string())
            .replace("{children}", &self.config.children.to_string())
    }

    async fn scrape(&self, client: &reqwest::Client) -> Result<Vec<Record>> {
        let html = fetch::get_text(client, &self.url()).await?;
        Ok(parse_rooms(&html))
    }

    fn alert_condition(&self, records: &[Record]) -> bool {
        records.iter().any(|r| self.matches_alert(r))
    }

    fn alert_subject(&self) -> String {
        format!(
            "Price Alert: Villa del Arco All-Inclusive Plan Below ${}",
            self.config.price_threshold_usd
        )
    }

    fn alert_body(&self, records: &[Record]) -> String {
        // Matching rows get a leading checkmark column.
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
            "Price Alert: Villa del Arco All-Inclusive Plan Below Threshold",
            &format!(
                "An All-Inclusive plan below your ${} threshold was found for {} to {} \
                 ({} adults, {} children). Matching plans are marked.",
                self.config.price_threshold_usd,
                self.config.check_in_date,
                self.config.check_out_date,
                self.config.adults,
                self.config.children
            ),
            &table,
            Some(&self.url()),
        )
    }
}

/// Slice `html` into chunks, each starting at one occurrence of `marker`.
fn blocks<'a>(html: &'a str, marker: &str) -> Vec<&'a str> {
    let mut starts: Vec<usize> = html.match_indices(marker).map(|(i, _)| i).collect();
    starts.push(html.len());
    starts
        .windows(2)
        .map(|pair| &html[pair[0]..pair[1]])
        .collect()
}

fn first_h3(block: &str) -> Option<String> {
    H3_RE.captures(block).map(|c| {
        let inner = TAG_RE.replace_all(&c[1], " ");
        inner.split_whitespace().collect::<Vec<_>>().join(" ")
    })
}

fn parse_usd(raw: &str) -> Option<u32> {
    let digits = DIGITS_RE.find(raw)?.as_str().replace(',', "");
    digits.parse().ok()
}

/// Extract room/rate/board rows from the availability page.
///
/// Scans the known block markers locally rather than matching the whole
/// document at once, so attribute noise inside a block cannot bleed into
/// its neighbors.
pub fn parse_rooms(html: &str) -> Vec<Record> {
    let mut records = Vec::new();

    for room_block in blocks(html, ROOM_MARKER) {
        let Some(room_name) = first_h3(room_block) else {
            continue;
        };

        for rate_block in blocks(room_block, RATE_MARKER) {
            let Some(rate_name) = first_h3(rate_block) else {
                continue;
            };

            for board_block in blocks(rate_block, BOARD_MARKER) {
                // Only boards carrying a loyalty price are bookable rows.
                let Some(price_raw) = PRICE_SPAN_RE
                    .captures(board_block)
                    .map(|c| c[1].to_string())
                else {
                    continue;
                };
                let Some(board_type) = BOARD_TYPE_RE
                    .captures(board_block)
                    .map(|c| c[1].to_string())
                else {
                    continue;
                };
                let price = parse_usd(&price_raw).unwrap_or(0);

                records.push(
                    Record::new()
                        .push("Room Name", Value::Text(room_name.clone()))
                        .push("Rate Name", Value::Text(rate_name.clone()))
                        .push("Board Type", Value::Text(board_type))
                        .push("Price (USD)", Value::Number(price as f64)),
                );
            }
        }
    }

    records
}
