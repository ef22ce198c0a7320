use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{header, Client, StatusCode, Url};

use crate::{config::SETTINGS, error::QuoteError, logging::Logger};

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        HttpResponse {
            status,
            body: body.into(),
        }
    }

    /// The canonical reason phrase of the status, e.g. `Too Many Requests`.
    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown Status")
    }
}

/// The outbound side of a fetch.
///
/// [`ReqwestTransport`] talks to the network; tests plug in scripted transports.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a GET request with the given query parameters and headers and reads
    /// the whole body.
    async fn get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: header::HeaderMap,
    ) -> Result<HttpResponse, QuoteError>;
}

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
///
/// The client's total timeout follows `SETTINGS.quote.request_timeout_secs`.
fn get_client() -> Result<&'static Client, QuoteError> {
    CLIENT.get_or_try_init(|| build_client(SETTINGS.quote.request_timeout()))
}

fn build_client(timeout: Duration) -> Result<Client, QuoteError> {
    // 已安裝過時會回傳 Err，可忽略
    let _ = rustls::crypto::ring::default_provider().install_default();

    Client::builder()
        .gzip(true)
        .connect_timeout(timeout)
        .timeout(timeout)
        .tcp_nodelay(true)
        .pool_max_idle_per_host(8)
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(concat!("quote_bot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|why| QuoteError::Config(format!("Failed to create reqwest client: {:?}", why)))
}

/// [`Transport`] backed by the shared reqwest client.
#[derive(Default, Clone)]
pub struct ReqwestTransport {
    client: Option<Client>,
}

impl ReqwestTransport {
    /// Uses the process-wide client.
    pub fn new() -> Self {
        ReqwestTransport { client: None }
    }

    /// Uses a dedicated client with its own timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, QuoteError> {
        Ok(ReqwestTransport {
            client: Some(build_client(timeout)?),
        })
    }

    fn client(&self) -> Result<&Client, QuoteError> {
        match &self.client {
            Some(client) => Ok(client),
            None => get_client(),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: header::HeaderMap,
    ) -> Result<HttpResponse, QuoteError> {
        let target = Url::parse_with_params(url, params)
            .map_err(|why| QuoteError::Config(format!("Invalid url {}: {:?}", url, why)))?;
        // api_key 不寫進 log
        let visit_log = format!("GET:{}", url);
        let start = Instant::now();

        let res = self.client()?.get(target).headers(headers).send().await;
        let elapsed = start.elapsed().as_millis();

        let response = match res {
            Ok(response) => response,
            Err(why) => {
                let why = why.without_url();
                LOGGER.error(format!("{} failed because {:?}. {} ms", visit_log, why, elapsed));
                return Err(why.into());
            }
        };

        let status = response.status();
        LOGGER.info(format!("{} {} {} ms", visit_log, status.as_u16(), elapsed));

        let body = response.text().await.map_err(|why| {
            let why = why.without_url();
            LOGGER.error(format!("{} body read failed because {:?}", visit_log, why));
            QuoteError::from(why)
        })?;

        Ok(HttpResponse { status, body })
    }
}
