//! Embedding environment detection.
//!
//! The core never inspects a user agent or a parent frame itself; the host
//! answers these two questions once per mount.

use crate::platform::PlatformSendSync;

pub trait EmbedContext: PlatformSendSync {
    /// True when the widget is hosted inside a social embed (for example a
    /// Twitter card) where autoplay may be attempted.
    fn is_embedded_social_context(&self) -> bool;

    /// True on phones and tablets, where autoplay is never attempted.
    fn is_mobile_device(&self) -> bool;
}

/// Fixed answers, set at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticEmbedContext {
    pub social: bool,
    pub mobile: bool,
}

impl StaticEmbedContext {
    pub fn new(social: bool, mobile: bool) -> Self {
        Self { social, mobile }
    }

    /// Derive the mobile flag from a user-agent string.
    pub fn from_user_agent(social: bool, user_agent: &str) -> Self {
        Self {
            social,
            mobile: is_mobile_user_agent(user_agent),
        }
    }
}

impl EmbedContext for StaticEmbedContext {
    fn is_embedded_social_context(&self) -> bool {
        self.social
    }

    fn is_mobile_device(&self) -> bool {
        self.mobile
    }
}

const MOBILE_MARKERS: &[&str] = &[
    "android",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
    "webos",
    "mobile",
];

/// Coarse user-agent sniffing, matching the markers browsers actually send.
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    MOBILE_MARKERS.iter().any(|marker| ua.contains(marker))
}
