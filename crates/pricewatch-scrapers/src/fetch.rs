//! Shared HTTP fetch layer.
//!
//! One client per job, built from `[http]` config. The request timeout
//! here is the only timeout in the system; the scheduler imposes none.

use std::time::Duration;

use pricewatch_core::config::HttpConfig;
use pricewatch_core::{PricewatchError, Result};

/// Build the reqwest client used by a scraper job.
pub fn build_client(http: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(http.timeout_secs))
        .user_agent(http.user_agent.clone())
        .build()
        .map_err(|e| PricewatchError::Http(format!("build client: {e}")))
}

/// GET a page body as text. Non-2xx statuses are errors.
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PricewatchError::Http(format!("GET {url}: {e}")))?
        .error_for_status()
        .map_err(|e| PricewatchError::Http(format!("GET {url}: {e}")))?;
    response
        .text()
        .await
        .map_err(|e| PricewatchError::Http(format!("read body from {url}: {e}")))
}

/// GET and decode a JSON body.
pub async fn get_json(client: &reqwest::Client, url: &str) -> Result<serde_json::Value> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PricewatchError::Http(format!("GET {url}: {e}")))?
        .error_for_status()
        .map_err(|e| PricewatchError::Http(format!("GET {url}: {e}")))?;
    response
        .json()
        .await
        .map_err(|e| PricewatchError::Http(format!("decode JSON from {url}: {e}")))
}
