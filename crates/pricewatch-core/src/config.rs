//! Pricewatch configuration system.
//!
//! Settings load from a TOML file (default `~/.pricewatch/config.toml`),
//! then selected keys are overridden from the environment so deployments
//! never have to commit credentials.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PricewatchError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricewatchConfig {
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub power_to_choose: PowerToChooseConfig,
    #[serde(default)]
    pub villa_del_arco: VillaDelArcoConfig,
    #[serde(default)]
    pub alaska_award: AlaskaAwardConfig,
}

impl PricewatchConfig {
    /// Load config from the default path, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from a specific path, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PricewatchError::Config(format!("failed to read config: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| PricewatchError::Config(format!("failed to parse config: {e}")))
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pricewatch")
            .join("config.toml")
    }

    /// Override selected keys from an environment-style lookup.
    ///
    /// Unparseable numeric values keep the current setting.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set_string = |slot: &mut String, key: &str| {
            if let Some(v) = lookup(key) {
                *slot = v;
            }
        };
        set_string(&mut self.email.sender, "SENDER_EMAIL");
        set_string(&mut self.email.password, "SENDER_PASSWORD");
        set_string(&mut self.email.recipient, "RECIPIENT_EMAIL");

        set_string(&mut self.power_to_choose.zip_code, "PTC_ZIP_CODE");
        if let Some(v) = lookup("PTC_CONTRACT_MIN").and_then(|v| v.parse().ok()) {
            self.power_to_choose.contract_min_months = v;
        }
        if let Some(v) = lookup("PTC_CONTRACT_MAX").and_then(|v| v.parse().ok()) {
            self.power_to_choose.contract_max_months = v;
        }
        if let Some(v) = lookup("PTC_PRICE_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.power_to_choose.price_threshold_cents = v;
        }
        if let Some(v) = lookup("PTC_MAX_RESULTS").and_then(|v| v.parse().ok()) {
            self.power_to_choose.max_results = v;
        }

        set_string(&mut self.villa_del_arco.check_in_date, "VDA_CHECK_IN");
        set_string(&mut self.villa_del_arco.check_out_date, "VDA_CHECK_OUT");
        if let Some(v) = lookup("VDA_ADULTS").and_then(|v| v.parse().ok()) {
            self.villa_del_arco.adults = v;
        }
        if let Some(v) = lookup("VDA_CHILDREN").and_then(|v| v.parse().ok()) {
            self.villa_del_arco.children = v;
        }
        if let Some(v) = lookup("VDA_PRICE_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.villa_del_arco.price_threshold_usd = v;
        }

        if let Some(v) = lookup("PRICEWATCH_HEALTH_ENABLED").and_then(|v| v.parse().ok()) {
            self.service.health_enabled = v;
        }
        if let Some(v) = lookup("PRICEWATCH_HEALTH_PORT").and_then(|v| v.parse().ok()) {
            self.service.health_port = v;
        }
    }

    /// Structural validation. Interval of zero would make a task loop spin.
    pub fn validate(&self) -> Result<()> {
        for (name, entry) in self.schedule.entries() {
            if entry.interval_minutes == 0 {
                return Err(PricewatchError::Config(format!(
                    "schedule.{name}: interval_minutes must be positive"
                )));
            }
        }
        Ok(())
    }
}

/// Outbound alert email settings. SMTPS (implicit TLS) by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    465
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            sender: String::new(),
            password: String::new(),
            recipient: String::new(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
        }
    }
}

impl EmailConfig {
    /// All three credentials present. Incomplete config degrades alert
    /// delivery only; scraping and health reporting continue.
    pub fn is_complete(&self) -> bool {
        !self.sender.is_empty() && !self.password.is_empty() && !self.recipient.is_empty()
    }
}

/// Service-level options for the long-running mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "bool_true")]
    pub health_enabled: bool,
    #[serde(default = "default_health_port")]
    pub health_port: u16,
}

fn default_health_port() -> u16 {
    8080
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            health_enabled: true,
            health_port: default_health_port(),
        }
    }
}

/// Outbound HTTP fetch settings shared by all scrapers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_user_agent() -> String {
    concat!("pricewatch/", env!("CARGO_PKG_VERSION")).into()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Per-task scheduling options, keyed by scraper name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub power_to_choose: ScheduleEntry,
    #[serde(default)]
    pub villa_del_arco: ScheduleEntry,
    #[serde(default)]
    pub alaska_award: ScheduleEntry,
}

impl ScheduleConfig {
    pub fn entry(&self, name: &str) -> Option<&ScheduleEntry> {
        match name {
            "power_to_choose" => Some(&self.power_to_choose),
            "villa_del_arco" => Some(&self.villa_del_arco),
            "alaska_award" => Some(&self.alaska_award),
            _ => None,
        }
    }

    /// All entries with their names, in registry order.
    pub fn entries(&self) -> Vec<(&'static str, &ScheduleEntry)> {
        vec![
            ("power_to_choose", &self.power_to_choose),
            ("villa_del_arco", &self.villa_del_arco),
            ("alaska_award", &self.alaska_award),
        ]
    }
}

/// When and how often one task runs. Immutable during a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScheduleEntry {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    #[serde(default = "bool_true")]
    pub run_immediately: bool,
}

fn default_interval_minutes() -> u64 {
    60
}

impl Default for ScheduleEntry {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: default_interval_minutes(),
            run_immediately: true,
        }
    }
}

/// Power to Choose electricity plan search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerToChooseConfig {
    #[serde(default = "default_zip_code")]
    pub zip_code: String,
    #[serde(default = "default_contract_min")]
    pub contract_min_months: u32,
    #[serde(default = "default_contract_max")]
    pub contract_max_months: u32,
    #[serde(default = "default_price_threshold_cents")]
    pub price_threshold_cents: f64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_zip_code() -> String {
    "76092".into()
}
fn default_contract_min() -> u32 {
    12
}
fn default_contract_max() -> u32 {
    60
}
fn default_price_threshold_cents() -> f64 {
    12.4
}
fn default_max_results() -> usize {
    5
}

impl Default for PowerToChooseConfig {
    fn default() -> Self {
        Self {
            zip_code: default_zip_code(),
            contract_min_months: default_contract_min(),
            contract_max_months: default_contract_max(),
            price_threshold_cents: default_price_threshold_cents(),
            max_results: default_max_results(),
        }
    }
}

/// Villa del Arco hotel availability search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VillaDelArcoConfig {
    #[serde(default = "default_check_in")]
    pub check_in_date: String,
    #[serde(default = "default_check_out")]
    pub check_out_date: String,
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default = "default_children")]
    pub children: u32,
    #[serde(default = "default_price_threshold_usd")]
    pub price_threshold_usd: u32,
    #[serde(default = "default_vda_base_url")]
    pub base_url: String,
}

fn default_check_in() -> String {
    "2025-12-16".into()
}
fn default_check_out() -> String {
    "2025-12-19".into()
}
fn default_adults() -> u32 {
    2
}
fn default_children() -> u32 {
    2
}
fn default_price_threshold_usd() -> u32 {
    1100
}
fn default_vda_base_url() -> String {
    "https://booking.villadelarco.com/bookcore/availability/villarco/{check_in}/{check_out}/{adults}/{children}/?lang=en&rrc=1&adults={adults}&ninos={children}".into()
}

impl Default for VillaDelArcoConfig {
    fn default() -> Self {
        Self {
            check_in_date: default_check_in(),
            check_out_date: default_check_out(),
            adults: default_adults(),
            children: default_children(),
            price_threshold_usd: default_price_threshold_usd(),
            base_url: default_vda_base_url(),
        }
    }
}

/// Alaska Airlines award availability search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlaskaAwardConfig {
    #[serde(default = "default_departure")]
    pub departure_station: String,
    #[serde(default = "default_arrivals")]
    pub target_arrival_stations: Vec<String>,
    #[serde(default = "default_target_points")]
    pub target_points: u32,
    #[serde(default = "default_search_date")]
    pub search_date: String,
    #[serde(default = "default_alaska_base_url")]
    pub base_search_url: String,
}

fn default_departure() -> String {
    "DFW".into()
}
fn default_arrivals() -> Vec<String> {
    vec!["SNA".into(), "ONT".into()]
}
fn default_target_points() -> u32 {
    7500
}
fn default_search_date() -> String {
    "2025-11-14".into()
}
fn default_alaska_base_url() -> String {
    "https://www.alaskaair.com/search/results?A=3&C=2&L=0&O={departure}&D={arrival}&OD={date}&RT=false&ShoppingMethod=onlineaward".into()
}

impl Default for AlaskaAwardConfig {
    fn default() -> Self {
        Self {
            departure_station: default_departure(),
            target_arrival_stations: default_arrivals(),
            target_points: default_target_points(),
            search_date: default_search_date(),
            base_search_url: default_alaska_base_url(),
        }
    }
}

fn bool_true() -> bool {
    true
}

/// Convenience for tests and tools: env lookup backed by a map.
pub fn env_from_map(map: HashMap<String, String>) -> impl Fn(&str) -> Option<String> {
    move |key| map.get(key).cloned()
}
