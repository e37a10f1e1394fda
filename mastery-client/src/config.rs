/// Client configuration
///
/// # Environment Variables
///
/// - `MASTERY_API_URL`: Base URL of the API server (default: http://127.0.0.1:8080)
/// - `MASTERY_APP_URL`: Application URL, also the login location (default: https://app.medicaremastery.app)
/// - `MASTERY_SITE_URL`: Marketing site URL (default: https://medicaremastery.app)
/// - `MASTERY_APP_HOST`: Host name of the application (default: app.medicaremastery.app)
/// - `MASTERY_CHECKOUT_URL`: Hosted checkout link
/// - `MASTERY_POLL_INTERVAL_MS`: Entitlement poll interval (default: 2000)
/// - `MASTERY_POLL_MAX_ATTEMPTS`: Entitlement poll bound (default: 30)

use crate::gate::{GateConfig, LOCAL_DEV_HOST};
use crate::poller::PollerConfig;
use reqwest::Url;
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_APP_URL: &str = "https://app.medicaremastery.app";
pub const DEFAULT_SITE_URL: &str = "https://medicaremastery.app";
pub const DEFAULT_APP_HOST: &str = "app.medicaremastery.app";
pub const DEFAULT_CHECKOUT_URL: &str = "https://buy.stripe.com/eVqaERa8Fah48ri99Q8k800";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: Url,

    pub app_url: Url,

    pub site_url: Url,

    pub app_host: String,

    pub checkout_url: Url,

    pub poll_interval: Duration,

    pub poll_max_attempts: u32,
}

impl ClientConfig {
    /// Loads configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = |key: &str, default: &str| -> anyhow::Result<Url> {
            let raw = lookup(key).unwrap_or_else(|| default.to_string());
            Url::parse(&raw).map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", key, e))
        };

        let api_url = url("MASTERY_API_URL", DEFAULT_API_URL)?;
        let app_url = url("MASTERY_APP_URL", DEFAULT_APP_URL)?;
        let site_url = url("MASTERY_SITE_URL", DEFAULT_SITE_URL)?;
        let checkout_url = url("MASTERY_CHECKOUT_URL", DEFAULT_CHECKOUT_URL)?;

        let app_host = lookup("MASTERY_APP_HOST").unwrap_or_else(|| DEFAULT_APP_HOST.to_string());

        let poll_interval_ms = lookup("MASTERY_POLL_INTERVAL_MS")
            .unwrap_or_else(|| "2000".to_string())
            .parse::<u64>()?;

        let poll_max_attempts = lookup("MASTERY_POLL_MAX_ATTEMPTS")
            .unwrap_or_else(|| "30".to_string())
            .parse::<u32>()?;

        if poll_interval_ms == 0 || poll_max_attempts == 0 {
            anyhow::bail!("Poll interval and attempt bound must be positive");
        }

        Ok(Self {
            api_url,
            app_url,
            site_url,
            app_host,
            checkout_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            poll_max_attempts,
        })
    }

    pub fn gate(&self) -> GateConfig {
        GateConfig {
            app_host: self.app_host.clone(),
            app_url: self.app_url.to_string(),
            site_url: self.site_url.to_string(),
        }
    }

    /// Poller settings for a success page served from `host`.
    pub fn poller(&self, host: &str) -> PollerConfig {
        PollerConfig {
            interval: self.poll_interval,
            max_attempts: self.poll_max_attempts,
            redirect_to: self.post_purchase_location(host),
            ..PollerConfig::default()
        }
    }

    /// Where a finished purchase lands: the local root during development,
    /// the application otherwise.
    pub fn post_purchase_location(&self, host: &str) -> String {
        if host == LOCAL_DEV_HOST {
            "/".to_string()
        } else {
            self.app_url.to_string()
        }
    }
}
