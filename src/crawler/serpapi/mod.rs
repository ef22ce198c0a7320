//! # SerpApi 報價模組
//!
//! 透過 SerpApi finance 端點取得單一股票的即時報價。
//!
//! - 主要端點：`{base_url}/finance/quotes/{symbol}`
//! - 驗證方式：query `api_key` 與 `Authorization: Bearer` 標頭同時帶入

use std::sync::Arc;

use async_trait::async_trait;
use concat_string::concat_string;
use reqwest::header::{self, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use crate::{
    config::App,
    crawler::{fetcher::Fetcher, QuoteSource},
    declare::{Price, Quote},
    error::QuoteError,
    util::http::{ReqwestTransport, Transport},
};

/// SerpApi 報價採集器。
#[derive(Clone)]
pub struct SerpApi {
    base_url: String,
    api_key: String,
    fetcher: Fetcher,
}

impl SerpApi {
    pub fn new(base_url: &str, api_key: &str, fetcher: Fetcher) -> Self {
        SerpApi {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            fetcher,
        }
    }

    /// Builds a provider on the shared reqwest client from the given settings.
    pub fn from_settings(settings: &App) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new());
        let fetcher = Fetcher::new(transport, settings.quote.request_timeout());
        SerpApi::new(&settings.serpapi.base_url, &settings.serpapi.api_key, fetcher)
    }

    fn quote_url(&self, symbol: &str) -> String {
        concat_string!(self.base_url, "/finance/quotes/", symbol)
    }

    fn build_headers(&self) -> Result<header::HeaderMap, QuoteError> {
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|why| QuoteError::Config(format!("Invalid SERPAPI_KEY: {:?}", why)))?;
        let mut headers = header::HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }
}

#[async_trait]
impl QuoteSource for SerpApi {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        if self.api_key.is_empty() {
            return Err(QuoteError::Config("SERPAPI_KEY is not set".to_string()));
        }

        let data = self
            .fetcher
            .fetch_json(
                &self.quote_url(symbol),
                &[("api_key", self.api_key.as_str())],
                self.build_headers()?,
            )
            .await?;

        Ok(normalize(symbol, &data))
    }
}

/// 轉成共用的報價格式，price / time 原樣保留，缺少時為 None
pub fn normalize(symbol: &str, data: &Value) -> Quote {
    let price = data.get("price").and_then(Price::from_json);

    let time = match data.get("time") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
    };

    Quote::new(symbol, price, time)
}
