//! What the host asked the widget to show.

use crate::error::{CoreError, Result};
use core_playback::{Collection, Track};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Track,
    Collection,
}

/// Layout variant. The core only carries it through for the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerFlavor {
    #[default]
    Card,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    pub request_type: RequestType,
    #[serde(default)]
    pub flavor: PlayerFlavor,
    pub id: u64,
    pub owner_id: u64,
    /// Hosted in a Twitter card.
    #[serde(default)]
    pub is_twitter: bool,
}

impl PlayerRequest {
    pub fn track(id: u64, owner_id: u64) -> Self {
        Self {
            request_type: RequestType::Track,
            flavor: PlayerFlavor::Card,
            id,
            owner_id,
            is_twitter: false,
        }
    }

    pub fn collection(id: u64, owner_id: u64) -> Self {
        Self {
            request_type: RequestType::Collection,
            ..Self::track(id, owner_id)
        }
    }

    pub fn with_flavor(mut self, flavor: PlayerFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn with_twitter(mut self, is_twitter: bool) -> Self {
        self.is_twitter = is_twitter;
        self
    }
}

/// Resolved content for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerContent {
    Track(Track),
    Collection(Collection),
}

impl PlayerContent {
    /// Playable tracks in display order.
    pub fn tracks(&self) -> &[Track] {
        match self {
            PlayerContent::Track(track) => std::slice::from_ref(track),
            PlayerContent::Collection(collection) => &collection.tracks,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, PlayerContent::Collection(_))
    }

    /// Check that the content is what `request` asked for and has something
    /// to play.
    pub fn check(&self, request: &PlayerRequest) -> Result<()> {
        match (request.request_type, self) {
            (RequestType::Track, PlayerContent::Track(_)) => Ok(()),
            (RequestType::Collection, PlayerContent::Collection(c)) if c.tracks.is_empty() => {
                Err(CoreError::InvalidRequest(format!(
                    "collection {} has no tracks",
                    c.id
                )))
            }
            (RequestType::Collection, PlayerContent::Collection(_)) => Ok(()),
            (expected, _) => Err(CoreError::InvalidRequest(format!(
                "expected {:?} content for request {}",
                expected, request.id
            ))),
        }
    }
}

/// Keys the widget reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKey {
    Space,
    Other,
}
