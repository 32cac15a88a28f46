//! Listen report delivery over HTTP.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    ListenReport, ListenReporter,
};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Posts each [`ListenReport`] as JSON to a collector endpoint.
///
/// One request per report. Failures surface as `BridgeError::Network`; the
/// caller decides what to do with them (the core logs and drops them).
pub struct HttpListenReporter {
    client: Client,
    endpoint: String,
}

impl HttpListenReporter {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e)))?;
        Self::with_client(client, endpoint)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(BridgeError::OperationFailed(format!(
                "Listen endpoint must be an http(s) URL: {}",
                endpoint
            )));
        }
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ListenReporter for HttpListenReporter {
    async fn report_listen(&self, report: ListenReport) -> Result<()> {
        debug!(
            track_id = %report.track_id,
            media_key = %report.media_key,
            "Posting listen report"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&report)
            .send()
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Network(format!(
                "Listen collector answered HTTP {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{MediaKey, TrackId};
    use chrono::Utc;

    #[test]
    fn endpoint_must_be_http() {
        assert!(HttpListenReporter::new("ftp://collector.example/listen").is_err());
        let reporter = HttpListenReporter::new("https://collector.example/listen").unwrap();
        assert_eq!(reporter.endpoint(), "https://collector.example/listen");
    }

    #[tokio::test]
    async fn unreachable_collector_is_a_network_error() {
        let reporter = HttpListenReporter::new("http://127.0.0.1:9/listen").unwrap();
        let report = ListenReport {
            track_id: TrackId(7),
            media_key: MediaKey::new(),
            elapsed_seconds: 1.0,
            recorded_at: Utc::now(),
        };

        let err = reporter.report_listen(report).await.unwrap_err();
        assert!(matches!(err, BridgeError::Network(_)));
    }
}
