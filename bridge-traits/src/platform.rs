//! Marker traits that keep capability bounds aligned with the threading model
//! of each target.
//!
//! Native hosts share capabilities across tokio tasks and need `Send + Sync`.
//! A `wasm32` host runs on the page's single event loop where browser handles
//! are not thread-safe, so the bounds collapse to nothing there.

/// `Send + Sync` on native targets, no bound on `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSendSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSendSync for T where T: Send + Sync {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSendSync {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSendSync for T {}

/// `Send` on native targets, no bound on `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSend: Send {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSend for T where T: Send {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSend {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSend for T {}

/// Deregistration hook run when a host subscription is dropped.
#[cfg(not(target_arch = "wasm32"))]
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

#[cfg(target_arch = "wasm32")]
pub type Unsubscribe = Box<dyn FnOnce()>;
