//! # Desktop Bridge Implementations
//!
//! Default implementations of the network-facing bridge traits for native
//! hosts (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - [`ReqwestSegmentFetcher`] resolves segment locators against content
//!   gateways and downloads them with retry and backoff
//! - [`HttpListenReporter`] posts listen reports to a collector endpoint
//!
//! Audio output, embed detection and cross-frame messaging stay with the
//! host; there is no sensible desktop default for them.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{GatewayConfig, HttpListenReporter, ReqwestSegmentFetcher};
//!
//! let fetcher = ReqwestSegmentFetcher::new(
//!     GatewayConfig::default().with_gateways(["https://gateway.example/ipfs/"]),
//! )?;
//! let reporter = HttpListenReporter::new("https://collector.example/listen")?;
//! ```

mod reporter;
mod retry;
mod segments;

pub use reporter::HttpListenReporter;
pub use retry::RetryPolicy;
pub use segments::{GatewayConfig, ReqwestSegmentFetcher, DEFAULT_GATEWAY};
