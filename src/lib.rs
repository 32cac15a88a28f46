//! Workspace umbrella crate.
//!
//! Re-exports the embed player façade so a host can depend on a single crate
//! and pick either the full widget (`desktop-shims`, default) or just the
//! engine and remote-control pieces (`engine-only`).

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "engine-only")]
pub use core_playback as playback;

#[cfg(feature = "engine-only")]
pub use core_remote as remote;
