//! Outbound JSON over HTTP, shared by the job source and embedding providers

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::DomainError;

/// The one HTTP verb the engine needs. Providers are generic over it so
/// tests can swap in a canned client.
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    /// Non-2xx replies come back as `Provider` errors carrying the body
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map(|inner| Self { inner })
            .map_err(|e| DomainError::configuration(format!("cannot build HTTP client: {}", e)))
    }
}

fn transport_error(e: reqwest::Error) -> DomainError {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_decode() {
        "unreadable JSON"
    } else {
        "transport error"
    };
    DomainError::provider("http", format!("{}: {}", kind, e))
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError> {
        let request = headers
            .into_iter()
            .fold(self.inner.post(url), |req, (name, value)| req.header(name, value));

        let response = request.json(body).send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DomainError::provider(
                "http",
                format!("HTTP {}: {}", status, detail),
            ));
        }

        response.json().await.map_err(transport_error)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_post_json_sends_headers_and_body() {
        let server = MockServer::start().await;
        let body = serde_json::json!({"query": "analyst"});

        Mock::given(method("POST"))
            .and(path("/api/job"))
            .and(header("x-api-key", "secret"))
            .and(body_json(&body))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let client = HttpClient::new();
        let response = client
            .post_json(
                &format!("{}/api/job", server.uri()),
                vec![("x-api-key", "secret")],
                &body,
            )
            .await
            .unwrap();

        assert_eq!(response["ok"], true);
    }

    #[tokio::test]
    async fn test_post_json_maps_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = HttpClient::with_timeout(Duration::from_secs(5)).unwrap();
        let error = client
            .post_json(&server.uri(), vec![], &serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(error.to_string().contains("429"));
        assert!(error.to_string().contains("slow down"));
    }
}
