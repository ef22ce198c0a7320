use std::{env, path::Path, path::PathBuf, time::Duration};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logging;

const CONFIG_PATH: &str = "app.json";

const SERPAPI_KEY: &str = "SERPAPI_KEY";
const SERPAPI_BASE_URL: &str = "SERPAPI_BASE_URL";

const DEFAULT_BASE_URL: &str = "https://serpapi.com";
const DEFAULT_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 3;
const DEFAULT_RATE_LIMIT_PERMITS: usize = 5;
const DEFAULT_RATE_LIMIT_PERIOD_MS: u64 = 1000;

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub serpapi: SerpApiSettings,
    #[serde(default)]
    pub quote: QuoteSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SerpApiSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for SerpApiSettings {
    fn default() -> Self {
        SerpApiSettings {
            api_key: String::new(),
            base_url: default_base_url(),
        }
    }
}

/// 報價快取、逾時與限流的設定
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuoteSettings {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_rate_limit_permits")]
    pub rate_limit_permits: usize,
    #[serde(default = "default_rate_limit_period_ms")]
    pub rate_limit_period_ms: u64,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        QuoteSettings {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            rate_limit_permits: DEFAULT_RATE_LIMIT_PERMITS,
            rate_limit_period_ms: DEFAULT_RATE_LIMIT_PERIOD_MS,
        }
    }
}

impl QuoteSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn rate_limit_period(&self) -> Duration {
        Duration::from_millis(self.rate_limit_period_ms)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_rate_limit_permits() -> usize {
    DEFAULT_RATE_LIMIT_PERMITS
}

fn default_rate_limit_period_ms() -> u64 {
    DEFAULT_RATE_LIMIT_PERIOD_MS
}

pub static SETTINGS: Lazy<App> = Lazy::new(|| {
    App::get().unwrap_or_else(|why| {
        logging::error_file_async(format!(
            "I can't read the config context because {:?}",
            why
        ));
        App::from_env()
    })
});

impl App {
    fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            return App::load(&config_path);
        }

        Ok(App::from_env())
    }

    /// 讀取指定的設定檔，再以 env 覆蓋
    pub fn load(path: &Path) -> Result<Self> {
        let config: App = config_config::builder()
            .add_source(config_file::from(path))
            .build()?
            .try_deserialize()?;

        Ok(config.override_with_env())
    }

    /// 從 env 中讀取設定值，其餘使用預設值
    fn from_env() -> Self {
        App::default().override_with_env()
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(api_key) = env::var(SERPAPI_KEY) {
            self.serpapi.api_key = api_key;
        }

        if let Ok(base_url) = env::var(SERPAPI_BASE_URL) {
            self.serpapi.base_url = base_url;
        }

        if self.serpapi.api_key.trim().is_empty() {
            logging::warn_file_async(format!("{} is not set", SERPAPI_KEY));
        }

        self
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
