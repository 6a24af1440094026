//! HTTP metric fetcher.
//!
//! POSTs a [`MetricRequest`] as JSON to a scoring service and decodes the
//! [`MetricValue`] it answers with.

use crate::error::FetchError;
use crate::fetcher::{MetricFetcher, MetricRequest};
use fairlens_metrics::MetricValue;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// User agent sent with every request
const USER_AGENT: &str = concat!("fairlens/", env!("CARGO_PKG_VERSION"));

/// Default scoring endpoint
const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/metrics";

/// Remote scoring service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// URL the requests are POSTed to
    pub endpoint: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Honour `HTTP_PROXY` and friends
    pub use_system_proxy: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
            use_system_proxy: true,
        }
    }
}

impl RemoteConfig {
    /// Configuration for the given endpoint with default settings.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

/// Fetcher backed by a remote scoring service.
#[derive(Debug, Clone)]
pub struct HttpMetricFetcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMetricFetcher {
    /// Create a fetcher for the configured endpoint.
    pub fn new(config: &RemoteConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs));
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl MetricFetcher for HttpMetricFetcher {
    fn fetch(&self, request: MetricRequest) -> BoxFuture<'static, Result<MetricValue, FetchError>> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();

        async move {
            debug!(
                endpoint = %endpoint,
                metric_key = %request.metric_key,
                model_index = request.model_index,
                "requesting metric"
            );

            let response = client
                .post(&endpoint)
                .json(&request)
                .send()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(FetchError::Http {
                    status: status.as_u16(),
                    message,
                });
            }

            response
                .json::<MetricValue>()
                .await
                .map_err(|e| FetchError::Decode(e.to_string()))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    /// Serve one HTTP response and hand back the raw request.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = find_header_end(&buf) {
                    let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                    let content_length = headers
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "{}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf).into_owned()
        });

        (format!("http://{}/metrics", addr), handle)
    }

    fn local_fetcher(endpoint: String) -> HttpMetricFetcher {
        let config = RemoteConfig {
            endpoint,
            timeout_secs: 5,
            use_system_proxy: false,
        };
        HttpMetricFetcher::new(&config).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = RemoteConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout_secs, 30);

        let parsed: RemoteConfig =
            serde_json::from_str(r#"{"endpoint": "http://scoring:8080/metrics"}"#).unwrap();
        assert_eq!(parsed, RemoteConfig::with_endpoint("http://scoring:8080/metrics"));
    }

    #[tokio::test]
    async fn test_fetch_posts_request_and_decodes_value() {
        let (endpoint, server) =
            serve_once("HTTP/1.1 200 OK", r#"{"global": 0.8, "bins": [0.7, null, 0.9]}"#).await;
        let fetcher = local_fetcher(endpoint);

        let value = fetcher
            .fetch(MetricRequest::new("accuracy_score", vec![0, 2, 1], 1))
            .await
            .unwrap();
        assert_eq!(value.global, Some(0.8));
        assert_eq!(value.bins, Some(vec![Some(0.7), None, Some(0.9)]));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /metrics"));
        let body = &raw[find_header_end(raw.as_bytes()).unwrap() + 4..];
        let sent: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({
                "metricKey": "accuracy_score",
                "binVector": [0, 2, 1],
                "modelIndex": 1
            })
        );
    }

    #[tokio::test]
    async fn test_fetch_maps_http_errors() {
        let (endpoint, server) =
            serve_once("HTTP/1.1 500 Internal Server Error", r#"{"error": "boom"}"#).await;
        let fetcher = local_fetcher(endpoint);

        let err = fetcher
            .fetch(MetricRequest::new("accuracy_score", vec![], 0))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 500, .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_maps_decode_errors() {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", r#""not a metric value""#).await;
        let fetcher = local_fetcher(endpoint);

        let err = fetcher
            .fetch(MetricRequest::new("accuracy_score", vec![], 0))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        server.await.unwrap();
    }
}
