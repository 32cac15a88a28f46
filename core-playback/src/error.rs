//! # Playback Error Types
//!
//! Faults the engine records on its snapshot. Engine operations never return
//! these; callers observe them through `PlaybackSnapshot::error`.

use bridge_traits::TrackId;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    // ========================================================================
    // Arming Errors
    // ========================================================================
    /// The track lists no audio segments.
    #[error("Track {0} has no audio segments")]
    EmptyTrack(TrackId),

    /// The fetcher could not map a segment descriptor to a fetchable address.
    #[error("Segment {index} could not be resolved: {reason}")]
    SegmentUnresolvable { index: usize, reason: String },

    /// `load_track` was issued before `init_audio` succeeded.
    #[error("Audio output is not initialized")]
    AudioNotInitialized,

    // ========================================================================
    // Buffering Errors
    // ========================================================================
    /// The segment being buffered failed to fetch or decode.
    #[error("Segment {index} failed to buffer: {reason}")]
    BufferStall { index: usize, reason: String },

    /// The segment being buffered did not arrive in time.
    #[error("Buffering segment {index} timed out after {timeout:?}")]
    BufferTimeout { index: usize, timeout: Duration },

    /// The audio output rejected a control call.
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Invalid playback configuration: {0}")]
    InvalidConfig(String),
}

impl PlaybackError {
    /// Errors raised while arming a session. The session is left unarmed.
    pub fn is_arming_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::EmptyTrack(_)
                | PlaybackError::SegmentUnresolvable { .. }
                | PlaybackError::AudioNotInitialized
        )
    }

    /// Errors that stopped an armed session mid-playback. Toggling play
    /// again retries from the kept position.
    pub fn is_buffer_stall(&self) -> bool {
        matches!(
            self,
            PlaybackError::BufferStall { .. }
                | PlaybackError::BufferTimeout { .. }
                | PlaybackError::AudioOutput(_)
        )
    }

    /// Whether re-issuing the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::BufferStall { .. }
                | PlaybackError::BufferTimeout { .. }
                | PlaybackError::AudioNotInitialized
        )
    }
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
