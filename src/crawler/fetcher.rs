use std::{sync::Arc, time::Duration};

use reqwest::{header, StatusCode};
use serde_json::Value;

use crate::{
    error::QuoteError,
    util::http::{HttpResponse, Transport},
};

/// Performs JSON GET requests under a total deadline and classifies failures.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Fetcher { transport, timeout }
    }

    /// Sends `GET url?params` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// * [`QuoteError::Timeout`] when the whole exchange exceeds the deadline.
    /// * [`QuoteError::Api`] for any status other than 200.
    /// * [`QuoteError::Decode`] when a 200 body is not JSON.
    /// * [`QuoteError::Transport`] for anything the transport itself reports.
    pub async fn fetch_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: header::HeaderMap,
    ) -> Result<Value, QuoteError> {
        let response =
            tokio::time::timeout(self.timeout, self.transport.get(url, params, headers)).await??;

        if response.status != StatusCode::OK {
            return Err(api_error(&response));
        }

        serde_json::from_str(&response.body).map_err(|why| QuoteError::Decode(why.to_string()))
    }
}

/// 從錯誤回應取出 code / message，沒有時改用 HTTP 狀態碼與說明
fn api_error(response: &HttpResponse) -> QuoteError {
    let body = serde_json::from_str::<Value>(&response.body).unwrap_or(Value::Null);

    let code = field_text(&body, "code").unwrap_or_else(|| response.status.as_u16().to_string());
    let message = field_text(&body, "message").unwrap_or_else(|| response.reason().to_string());

    QuoteError::Api { code, message }
}

fn field_text(body: &Value, name: &str) -> Option<String> {
    match body.get(name)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::header::{HeaderValue, AUTHORIZATION};

    use super::*;

    /// One request as seen by [`ScriptedTransport`].
    #[derive(Debug, Clone)]
    pub(crate) struct SeenRequest {
        pub url: String,
        pub params: Vec<(String, String)>,
        pub authorization: Option<String>,
    }

    /// Answers every request with the same canned response.
    pub(crate) struct ScriptedTransport {
        pub response: Result<HttpResponse, QuoteError>,
        pub seen: Mutex<Vec<SeenRequest>>,
    }

    impl ScriptedTransport {
        pub fn new(response: Result<HttpResponse, QuoteError>) -> Self {
            ScriptedTransport {
                response,
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn json(status: StatusCode, body: &str) -> Self {
            Self::new(Ok(HttpResponse::new(status, body)))
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(
            &self,
            url: &str,
            params: &[(&str, &str)],
            headers: header::HeaderMap,
        ) -> Result<HttpResponse, QuoteError> {
            self.seen.lock().unwrap().push(SeenRequest {
                url: url.to_string(),
                params: params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                authorization: headers
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(String::from),
            });
            self.response.clone()
        }
    }

    /// Never answers.
    pub(crate) struct PendingTransport;

    #[async_trait]
    impl Transport for PendingTransport {
        async fn get(
            &self,
            _url: &str,
            _params: &[(&str, &str)],
            _headers: header::HeaderMap,
        ) -> Result<HttpResponse, QuoteError> {
            std::future::pending().await
        }
    }

    fn fetcher(transport: impl Transport + 'static) -> Fetcher {
        Fetcher::new(Arc::new(transport), Duration::from_secs(3))
    }

    #[tokio::test]
    async fn test_fetch_json_ok() {
        let transport = Arc::new(ScriptedTransport::json(
            StatusCode::OK,
            r#"{"price": 150.25, "time": "2024-01-01T00:00:00Z"}"#,
        ));
        let fetcher = Fetcher::new(transport.clone(), Duration::from_secs(3));

        let mut headers = header::HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer k"));
        let value = fetcher
            .fetch_json("http://x/finance/quotes/AAPL", &[("api_key", "k")], headers)
            .await
            .unwrap();

        assert_eq!(value["time"], "2024-01-01T00:00:00Z");
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].params, vec![("api_key".to_string(), "k".to_string())]);
        assert_eq!(seen[0].authorization.as_deref(), Some("Bearer k"));
    }

    #[tokio::test]
    async fn test_api_error_from_body() {
        let fetcher = fetcher(ScriptedTransport::json(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"code":"rate_limited","message":"too many requests"}"#,
        ));

        let err = fetcher
            .fetch_json("http://x", &[], header::HeaderMap::new())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            QuoteError::Api {
                code: "rate_limited".to_string(),
                message: "too many requests".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_api_error_falls_back_to_status() {
        let fetcher = fetcher(ScriptedTransport::json(
            StatusCode::SERVICE_UNAVAILABLE,
            "<html>down</html>",
        ));

        let err = fetcher
            .fetch_json("http://x", &[], header::HeaderMap::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "API Error 503: Service Unavailable");
    }

    #[tokio::test]
    async fn test_api_error_partial_body() {
        let fetcher = fetcher(ScriptedTransport::json(
            StatusCode::NOT_FOUND,
            r#"{"code": 40401, "message": null}"#,
        ));

        let err = fetcher
            .fetch_json("http://x", &[], header::HeaderMap::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "API Error 40401: Not Found");
    }

    #[tokio::test]
    async fn test_non_json_success_is_decode_error() {
        let fetcher = fetcher(ScriptedTransport::json(StatusCode::OK, "not json"));

        let err = fetcher
            .fetch_json("http://x", &[], header::HeaderMap::new())
            .await
            .unwrap_err();

        assert!(matches!(err, QuoteError::Decode(_)));
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let fetcher = fetcher(ScriptedTransport::new(Err(QuoteError::Transport(
            "connection refused".to_string(),
        ))));

        let err = fetcher
            .fetch_json("http://x", &[], header::HeaderMap::new())
            .await
            .unwrap_err();

        assert_eq!(err, QuoteError::Transport("connection refused".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let fetcher = fetcher(PendingTransport);
        let start = tokio::time::Instant::now();

        let err = fetcher
            .fetch_json("http://x", &[], header::HeaderMap::new())
            .await
            .unwrap_err();

        assert_eq!(err, QuoteError::Timeout);
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
