//! HTTP client for the door station's web API.
//!
//! One instance is shared by the poll channel, the push channel, and the
//! command surface. Request/response bodies are the `protocol` types.

use crate::config::DeviceEndpointConfig;
use crate::error::{PanelError, Result};
use crate::protocol::{CommandAck, DeviceSettings, RelayFields, ResetAck, StatusResponse};

#[derive(Debug, Clone)]
pub struct DeviceClient {
    /// Client for request/response endpoints, with a total request timeout.
    api: reqwest::Client,
    /// Client for the event stream. A total timeout would cut the stream
    /// short, so this one only bounds connection establishment.
    stream: reqwest::Client,
    base_url: String,
}

impl DeviceClient {
    pub fn new(config: &DeviceEndpointConfig) -> Result<Self> {
        let api = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        let stream = reqwest::Client::builder()
            .connect_timeout(config.http_timeout())
            .build()?;

        Ok(Self {
            api,
            stream,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn require_success(resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(PanelError::HttpStatus(resp.status().as_u16()))
        }
    }

    /// Raw body of `GET /api/status`. Errors are transport-level only
    /// (unreachable, timed out, non-2xx); the poll channel parses the
    /// body itself so it can treat a malformed body separately.
    pub async fn fetch_status_body(&self) -> Result<String> {
        let resp = self.api.get(self.url("/api/status")).send().await?;
        Ok(Self::require_success(resp)?.text().await?)
    }

    /// Typed `GET /api/status`.
    pub async fn fetch_status(&self) -> Result<StatusResponse> {
        Ok(serde_json::from_str(&self.fetch_status_body().await?)?)
    }

    /// `GET /api/relays`: the bare relay map.
    pub async fn fetch_relays(&self) -> Result<RelayFields> {
        let resp = self.api.get(self.url("/api/relays")).send().await?;
        Ok(Self::require_success(resp)?.json().await?)
    }

    /// `GET /api/config`. Password fields arrive masked.
    pub async fn fetch_settings(&self) -> Result<DeviceSettings> {
        let resp = self.api.get(self.url("/api/config")).send().await?;
        Ok(Self::require_success(resp)?.json().await?)
    }

    /// `POST /api/config`. Password fields still holding the mask
    /// sentinel are stripped before the request so the device keeps its
    /// stored secrets.
    pub async fn save_settings(&self, settings: &DeviceSettings) -> Result<CommandAck> {
        let body = settings.clone().strip_masked();
        let resp = self
            .api
            .post(self.url("/api/config"))
            .json(&body)
            .send()
            .await?;
        Ok(Self::require_success(resp)?.json().await?)
    }

    /// `POST /api/doorbell`: ring the station.
    pub async fn press_doorbell(&self) -> Result<CommandAck> {
        let resp = self.api.post(self.url("/api/doorbell")).send().await?;
        Ok(Self::require_success(resp)?.json().await?)
    }

    /// `POST /api/factory-reset`. The firmware reports failure inside a
    /// 2xx body, which surfaces here as `CommandRejected`.
    pub async fn factory_reset(&self) -> Result<ResetAck> {
        let resp = self.api.post(self.url("/api/factory-reset")).send().await?;
        let ack: ResetAck = Self::require_success(resp)?.json().await?;
        if !ack.success {
            let detail = ack
                .error
                .or(ack.message)
                .unwrap_or_else(|| "no reason given".to_string());
            return Err(PanelError::CommandRejected(detail));
        }
        Ok(ack)
    }

    /// Open the `GET /events` subscription and hand back the response
    /// once headers confirm it. The caller drives the byte stream.
    pub async fn subscribe_events(&self) -> Result<reqwest::Response> {
        let resp = self
            .stream
            .get(self.url("/events"))
            .header("Accept", "text/event-stream")
            .send()
            .await?;
        Self::require_success(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn client_for(base_url: String) -> DeviceClient {
        DeviceClient::new(&DeviceEndpointConfig {
            base_url,
            http_timeout_ms: 1000,
        })
        .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = client_for("http://10.0.0.60:8080/".to_string());
        assert_eq!(client.base_url(), "http://10.0.0.60:8080");
        assert_eq!(client.url("/api/status"), "http://10.0.0.60:8080/api/status");
    }

    #[tokio::test]
    async fn test_fetch_status_parses_relays() {
        let body = r#"{"relays":{"door":true,"light":false},"system":"running","web_server":true}"#;
        let base = testutil::serve_once(testutil::http_json(body)).await;

        let status = client_for(base).fetch_status().await.unwrap();
        assert!(status.relays.door);
        assert!(!status.relays.light);
    }

    #[tokio::test]
    async fn test_non_2xx_is_http_status_error() {
        let base = testutil::serve_once(testutil::http_error(500, "Internal Server Error")).await;

        match client_for(base).fetch_status_body().await {
            Err(PanelError::HttpStatus(500)) => {}
            other => panic!("expected HttpStatus(500), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_factory_reset_failure_is_rejected() {
        let body = r#"{"success":false,"message":"Factory reset failed","error":"ESP_FAIL"}"#;
        let base = testutil::serve_once(testutil::http_json(body)).await;

        match client_for(base).factory_reset().await {
            Err(PanelError::CommandRejected(detail)) => assert_eq!(detail, "ESP_FAIL"),
            other => panic!("expected CommandRejected, got {:?}", other),
        }
    }
}
