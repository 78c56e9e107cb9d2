use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::UpstreamConfig;
use crate::error::FetchError;
use crate::models::RawEvent;

/// Anything that can produce the current upstream event list.
pub trait EventSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Vec<RawEvent>, FetchError>> + Send;
}

/// Клиент для публичного API полиции
#[derive(Clone)]
pub struct PolisenClient {
    http_client: reqwest::Client,
    events_url: String,
    base_url: String,
    timeout: Duration,
}

impl PolisenClient {
    pub fn new(http_client: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            http_client,
            events_url: config.events_url.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
        }
    }

    /// Shared HTTP client for every sensor and the suggestions directory.
    pub fn build_http_client(config: &UpstreamConfig) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("polisen_events/", env!("CARGO_PKG_VERSION")))
            .build()
    }

    /// Fetches the feed as loose JSON values; shape is checked, records are not.
    pub async fn fetch_values(&self) -> Result<Vec<Value>, FetchError> {
        let timeout_secs = self.timeout.as_secs();

        let response = self
            .http_client
            .get(&self.events_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout_secs))?;

        let value: Value =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        match value {
            Value::Array(items) => Ok(items),
            other => Err(FetchError::Shape(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn absolutize(&self, url: Option<String>) -> Option<String> {
        match url {
            Some(url) if url.starts_with('/') => Some(format!("{}{}", self.base_url, url)),
            Some(url) if url.trim().is_empty() => None,
            other => other,
        }
    }
}

impl EventSource for PolisenClient {
    async fn fetch(&self) -> Result<Vec<RawEvent>, FetchError> {
        let items = self.fetch_values().await?;
        let received = items.len();

        let events: Vec<RawEvent> = RawEvent::parse_batch(items)
            .into_iter()
            .map(|mut event| {
                event.url = self.absolutize(event.url.take());
                event
            })
            .collect();

        debug!(received, parsed = events.len(), "Fetched police events");
        if events.is_empty() && received > 0 {
            info!(received, "No usable records in police events response");
        }

        Ok(events)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout_secs: u64) -> PolisenClient {
        let config = UpstreamConfig {
            events_url: format!("{}/api/events", server.uri()),
            base_url: "https://polisen.se/".to_string(),
            request_timeout_secs: timeout_secs,
            ..UpstreamConfig::default()
        };
        let http = PolisenClient::build_http_client(&config).unwrap();
        PolisenClient::new(http, &config)
    }

    #[tokio::test]
    async fn fetches_and_absolutizes_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 1,
                    "name": "Stöld, Lund",
                    "datetime": "2024-01-10 10:00:00 +01:00",
                    "url": "/aktuellt/handelser/1/",
                    "type": "Stöld",
                    "location": { "name": "Lund", "gps": "55.7,13.1" }
                },
                {
                    "id": 2,
                    "name": "Brand, Malmö",
                    "datetime": "2024-01-10 11:00:00 +01:00",
                    "url": "https://example.org/x",
                    "type": "Brand",
                    "location": { "name": "Malmö" }
                },
                { "id": 3, "name": "broken" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let events = client_for(&server, 5).fetch().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].url.as_deref(),
            Some("https://polisen.se/aktuellt/handelser/1/")
        );
        assert_eq!(events[1].url.as_deref(), Some("https://example.org/x"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server, 5).fetch().await.unwrap_err();
        assert_eq!(err, FetchError::Status { status: 503 });
    }

    #[tokio::test]
    async fn object_body_is_a_shape_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "events": [] })))
            .mount(&server)
            .await;

        let err = client_for(&server, 5).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Shape(_)));
    }

    #[tokio::test]
    async fn invalid_json_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server, 5).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, 1).fetch().await.unwrap_err();
        assert_eq!(err, FetchError::Timeout(1));
    }
}
