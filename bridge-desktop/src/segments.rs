//! Segment fetching over HTTP gateways using Reqwest.

use crate::retry::{is_retryable_status, RetryPolicy};
use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    ResolvedSegment, SegmentAudio, SegmentDescriptor, SegmentFetcher,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Public gateway used when none is configured.
pub const DEFAULT_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Gateway list and transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URLs a bare content locator is appended to. The first one is
    /// tried first; the others take over on later attempts.
    pub gateways: Vec<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateways: vec![DEFAULT_GATEWAY.to_string()],
            timeout: Duration::from_secs(20),
            retry: RetryPolicy::default(),
            user_agent: concat!("embed-player-core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn with_gateways<I, S>(mut self, gateways: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gateways = gateways.into_iter().map(normalize_gateway).collect();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

fn normalize_gateway(gateway: impl Into<String>) -> String {
    let mut gateway = gateway.into();
    if !gateway.ends_with('/') {
        gateway.push('/');
    }
    gateway
}

fn is_absolute_url(locator: &str) -> bool {
    locator.starts_with("https://") || locator.starts_with("http://")
}

/// `SegmentFetcher` that downloads segments through content gateways.
///
/// Locators that are already absolute URLs are fetched as-is. Bare content
/// identifiers are appended to the configured gateways, rotating to the next
/// gateway on each retry.
pub struct ReqwestSegmentFetcher {
    client: Client,
    config: GatewayConfig,
}

impl ReqwestSegmentFetcher {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        if config.gateways.is_empty() {
            return Err(BridgeError::OperationFailed(
                "At least one gateway is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(GatewayConfig::default())
    }

    pub fn with_client(client: Client, config: GatewayConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// URL for `attempt` (0-based): the resolved URL itself, or the same
    /// locator on another gateway.
    fn url_for_attempt(&self, resolved: &str, attempt: u32) -> String {
        let primary = &self.config.gateways[0];
        match resolved.strip_prefix(primary.as_str()) {
            Some(locator) if self.config.gateways.len() > 1 => {
                let gateway = &self.config.gateways[attempt as usize % self.config.gateways.len()];
                format!("{}{}", gateway, locator)
            }
            _ => resolved.to_string(),
        }
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<bytes::Bytes, (BridgeError, bool)> {
        let response = self.client.get(url).send().await.map_err(|e| {
            let retry = e.is_timeout() || e.is_connect() || e.is_request();
            (BridgeError::Network(e.to_string()), retry)
        })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err((
                BridgeError::Network(format!("HTTP {} from gateway", status)),
                is_retryable_status(status),
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| (BridgeError::Network(e.to_string()), true))
    }
}

#[async_trait]
impl SegmentFetcher for ReqwestSegmentFetcher {
    fn resolve(&self, index: usize, segment: &SegmentDescriptor) -> Result<ResolvedSegment> {
        let locator = segment.locator.trim();
        if locator.is_empty() {
            return Err(BridgeError::InvalidLocator(format!(
                "segment {} has an empty locator",
                index
            )));
        }

        if is_absolute_url(locator) {
            return Ok(ResolvedSegment {
                index,
                url: locator.to_string(),
            });
        }

        if locator.contains(['/', '?', '#']) || locator.contains(char::is_whitespace) {
            return Err(BridgeError::InvalidLocator(format!(
                "segment {} locator is neither a URL nor a content id",
                index
            )));
        }

        Ok(ResolvedSegment {
            index,
            url: format!("{}{}", self.config.gateways[0], locator),
        })
    }

    async fn fetch(&self, segment: &ResolvedSegment) -> Result<SegmentAudio> {
        let policy = self.config.retry;
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < policy.max_attempts {
            let url = self.url_for_attempt(&segment.url, attempt);
            debug!(
                index = segment.index,
                attempt = attempt + 1,
                max_attempts = policy.max_attempts,
                "Fetching segment"
            );

            match self.fetch_once(&url).await {
                Ok(data) => {
                    debug!(index = segment.index, bytes = data.len(), "Segment fetched");
                    return Ok(SegmentAudio::new(segment.index, data));
                }
                Err((error, retryable)) => {
                    warn!(
                        index = segment.index,
                        attempt = attempt + 1,
                        error = %error,
                        "Segment fetch failed"
                    );
                    last_error = Some(error);
                    if !retryable {
                        break;
                    }
                }
            }

            attempt += 1;
            if attempt < policy.max_attempts {
                sleep(policy.delay_after(attempt)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BridgeError::Network("All retry attempts exhausted".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(gateways: &[&str]) -> ReqwestSegmentFetcher {
        let config = GatewayConfig::default().with_gateways(gateways.iter().copied());
        ReqwestSegmentFetcher::new(config).unwrap()
    }

    #[test]
    fn bare_locator_goes_through_primary_gateway() {
        let fetcher = fetcher(&["https://gw-a.example/ipfs", "https://gw-b.example/ipfs/"]);
        let resolved = fetcher
            .resolve(0, &SegmentDescriptor::new(" QmSegment "))
            .unwrap();
        assert_eq!(resolved.url, "https://gw-a.example/ipfs/QmSegment");
    }

    #[test]
    fn absolute_urls_are_kept() {
        let fetcher = fetcher(&["https://gw-a.example/ipfs/"]);
        let resolved = fetcher
            .resolve(2, &SegmentDescriptor::new("https://cdn.example/seg/2.ts"))
            .unwrap();
        assert_eq!(resolved.url, "https://cdn.example/seg/2.ts");
    }

    #[test]
    fn malformed_locators_are_rejected() {
        let fetcher = fetcher(&["https://gw-a.example/ipfs/"]);
        for locator in ["", "   ", "Qm/../etc", "Qm abc", "ftp://x"] {
            assert!(matches!(
                fetcher.resolve(1, &SegmentDescriptor::new(locator)),
                Err(BridgeError::InvalidLocator(_))
            ));
        }
    }

    #[test]
    fn retries_rotate_gateways() {
        let fetcher = fetcher(&["https://gw-a.example/ipfs/", "https://gw-b.example/ipfs/"]);
        let url = "https://gw-a.example/ipfs/QmX";
        assert_eq!(fetcher.url_for_attempt(url, 0), url);
        assert_eq!(
            fetcher.url_for_attempt(url, 1),
            "https://gw-b.example/ipfs/QmX"
        );
        assert_eq!(fetcher.url_for_attempt(url, 2), url);
        assert_eq!(
            fetcher.url_for_attempt("https://cdn.example/a", 1),
            "https://cdn.example/a"
        );
    }

    #[test]
    fn empty_gateway_list_is_rejected() {
        let config = GatewayConfig {
            gateways: Vec::new(),
            ..GatewayConfig::default()
        };
        assert!(ReqwestSegmentFetcher::new(config).is_err());
    }

    #[tokio::test]
    async fn unreachable_gateway_reports_network_error() {
        let config = GatewayConfig::default()
            .with_gateways(["http://127.0.0.1:9/ipfs/"])
            .with_retry(RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                use_exponential_backoff: false,
            });
        let fetcher = ReqwestSegmentFetcher::new(config).unwrap();
        let resolved = fetcher.resolve(0, &SegmentDescriptor::new("QmX")).unwrap();

        let err = fetcher.fetch(&resolved).await.unwrap_err();
        assert!(matches!(err, BridgeError::Network(_)));
    }
}
