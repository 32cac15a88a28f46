//! # Core Runtime Module
//!
//! Shared runtime infrastructure for the embed player core:
//! - Logging and tracing setup, with optional forwarding to a host sink
//! - Widget configuration and capability validation
//! - Event bus for engine, listen and remote-control notifications
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its error conventions,
//! logging helpers and event types. It holds no playback logic itself.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
