//! User configuration (`config/config.json`), camelCase on disk.
//!
//! A missing file is not fatal: credential-dependent steps degrade to
//! selector discovery only.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Target purchase amount in rupees. Zero means "scout with the
    /// test denomination only".
    #[serde(default)]
    pub target_amount: u32,
    #[serde(default)]
    pub available_denominations: Vec<u32>,
    #[serde(default)]
    pub user_details: Option<UserDetails>,
    #[serde(default)]
    pub card_details: Option<CardDetails>,
    #[serde(default)]
    pub scout: ScoutConfig,
}

impl Config {
    /// The amount used to pick a denomination row: the configured
    /// target, or the scout test denomination when none is set.
    pub fn effective_target(&self) -> u32 {
        if self.target_amount > 0 {
            self.target_amount
        } else {
            self.scout.test_denomination
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub mobile: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub last4_digits: String,
    #[serde(default)]
    pub card_name: Option<String>,
}

/// Tuning knobs for the scouting run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoutConfig {
    /// Pause after each mutating action, in milliseconds.
    #[serde(default = "default_slow_mo")]
    pub slow_mo: u64,
    /// Bound for each step wait, in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Denomination used when no target amount is configured.
    #[serde(default = "default_test_denomination")]
    pub test_denomination: u32,
    #[serde(default = "default_url")]
    pub url: String,
    /// Glob-style pattern the URL must match after "View Cart".
    #[serde(default = "default_cart_pattern")]
    pub cart_url_pattern: String,
    /// Glob-style pattern for the payment redirect.
    #[serde(default = "default_payment_pattern")]
    pub payment_url_pattern: String,
    /// WebDriver endpoint the backend connects to.
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            slow_mo: default_slow_mo(),
            timeout: default_timeout(),
            test_denomination: default_test_denomination(),
            url: default_url(),
            cart_url_pattern: default_cart_pattern(),
            payment_url_pattern: default_payment_pattern(),
            webdriver_url: default_webdriver_url(),
        }
    }
}

fn default_slow_mo() -> u64 {
    500
}

fn default_timeout() -> u64 {
    10_000
}

fn default_test_denomination() -> u32 {
    250
}

fn default_url() -> String {
    "https://www.gyftr.com/amexrewardmultiplier/amazon-gift-vouchers".to_string()
}

fn default_cart_pattern() -> String {
    "**/cart".to_string()
}

fn default_payment_pattern() -> String {
    "**/payment**".to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}
