//! # Engine Configuration
//!
//! Timing knobs for the playback engine and the listen recorder. Both types
//! deserialize with per-field defaults so a host may override a single value.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How often the play head is advanced and a snapshot published while
    /// playing.
    ///
    /// Default: 250 ms.
    #[serde(default = "default_position_tick")]
    pub position_tick: Duration,

    /// Longest time a segment may take to arrive before buffering gives up
    /// with a stall.
    ///
    /// Default: 15 seconds.
    #[serde(default = "default_buffering_timeout")]
    pub buffering_timeout: Duration,

    /// Segments fetched ahead of the one being played.
    ///
    /// Default: 1.
    #[serde(default = "default_prefetch_ahead")]
    pub prefetch_ahead: usize,

    /// Queue depth between engine handles and the engine task.
    ///
    /// Default: 32.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            position_tick: default_position_tick(),
            buffering_timeout: default_buffering_timeout(),
            prefetch_ahead: default_prefetch_ahead(),
            command_buffer: default_command_buffer(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.position_tick.is_zero() {
            return Err(PlaybackError::InvalidConfig(
                "position_tick must be > 0".to_string(),
            ));
        }

        if self.buffering_timeout < self.position_tick {
            return Err(PlaybackError::InvalidConfig(
                "buffering_timeout cannot be shorter than position_tick".to_string(),
            ));
        }

        if self.command_buffer == 0 {
            return Err(PlaybackError::InvalidConfig(
                "command_buffer must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Listen recorder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenConfig {
    /// Sampling period. Each sample taken while playing adds one period of
    /// listened time.
    ///
    /// Default: 1 second.
    #[serde(default = "default_sample_interval")]
    pub sample_interval: Duration,

    /// Listened time after which the session counts as a listen.
    ///
    /// Default: 1 second.
    #[serde(default = "default_listen_threshold")]
    pub threshold: Duration,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            sample_interval: default_sample_interval(),
            threshold: default_listen_threshold(),
        }
    }
}

impl ListenConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_interval.is_zero() {
            return Err(PlaybackError::InvalidConfig(
                "sample_interval must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_position_tick() -> Duration {
    Duration::from_millis(250)
}

fn default_buffering_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_prefetch_ahead() -> usize {
    1
}

fn default_command_buffer() -> usize {
    32
}

fn default_sample_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_listen_threshold() -> Duration {
    Duration::from_secs(1)
}
