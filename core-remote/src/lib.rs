//! # Remote Control
//!
//! Lets the embedding page drive the player with cross-frame messages.
//!
//! ## Wire format
//!
//! Each message is a JSON string:
//!
//! ```json
//! { "from": "audiusapi", "method": "seekTo", "value": 42.5 }
//! ```
//!
//! - `from` must equal the configured origin tag exactly.
//! - `method` is one of `togglePlay`, `stop` or `seekTo`.
//! - `value` is required and numeric for `seekTo`, ignored otherwise.
//!
//! Anything else is dropped with a debug trace. Nothing is ever reported back
//! to the sender.

pub mod bridge;
pub mod protocol;

pub use bridge::RemoteControlBridge;
pub use protocol::RemoteCommand;
