//! Per-session segment resolution, fetching and caching.

use crate::error::{PlaybackError, Result};
use crate::types::Track;
use bridge_traits::{BridgeError, ResolvedSegment, SegmentAudio, SegmentDescriptor, SegmentFetcher};
use core_runtime::logging::strip_locator;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Result of one spawned segment fetch, tagged with the epoch it was started
/// in so results from a torn-down session can be told apart.
#[derive(Debug)]
pub struct FetchOutcome {
    pub epoch: u64,
    pub index: usize,
    pub result: std::result::Result<SegmentAudio, BridgeError>,
}

/// Segments of the loaded track: resolved addresses, in-flight fetches and
/// the audio fetched so far.
pub struct SegmentSource {
    fetcher: Arc<dyn SegmentFetcher>,
    descriptors: Vec<SegmentDescriptor>,
    resolved: Vec<Option<ResolvedSegment>>,
    buffered: HashMap<usize, SegmentAudio>,
    in_flight: HashSet<usize>,
    epoch: u64,
    cancel: CancellationToken,
}

impl SegmentSource {
    /// Validate the track and resolve its first segment.
    pub fn new(fetcher: Arc<dyn SegmentFetcher>, track: &Track, epoch: u64) -> Result<Self> {
        if track.segments.is_empty() {
            return Err(PlaybackError::EmptyTrack(track.id));
        }

        let mut source = Self {
            fetcher,
            descriptors: track.segments.clone(),
            resolved: vec![None; track.segments.len()],
            buffered: HashMap::new(),
            in_flight: HashSet::new(),
            epoch,
            cancel: CancellationToken::new(),
        };
        source.resolve(0)?;
        Ok(source)
    }

    pub fn segment_count(&self) -> usize {
        self.descriptors.len()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn resolve(&mut self, index: usize) -> Result<ResolvedSegment> {
        if let Some(Some(resolved)) = self.resolved.get(index) {
            return Ok(resolved.clone());
        }

        let descriptor = self.descriptors.get(index).ok_or_else(|| {
            PlaybackError::SegmentUnresolvable {
                index,
                reason: "index past the last segment".to_string(),
            }
        })?;

        let resolved = self
            .fetcher
            .resolve(index, descriptor)
            .map_err(|e| PlaybackError::SegmentUnresolvable {
                index,
                reason: e.to_string(),
            })?;

        trace!(index, segment = %strip_locator(&resolved.url), "Resolved segment");
        self.resolved[index] = Some(resolved.clone());
        Ok(resolved)
    }

    pub fn buffered(&self, index: usize) -> Option<&SegmentAudio> {
        self.buffered.get(&index)
    }

    pub fn is_in_flight(&self, index: usize) -> bool {
        self.in_flight.contains(&index)
    }

    /// Start fetching `index` unless it is already buffered or on its way.
    pub fn ensure_fetching(
        &mut self,
        index: usize,
        outcomes: &mpsc::UnboundedSender<FetchOutcome>,
    ) -> Result<()> {
        if self.buffered.contains_key(&index) || self.in_flight.contains(&index) {
            return Ok(());
        }

        let resolved = self.resolve(index)?;
        self.in_flight.insert(index);

        let fetcher = Arc::clone(&self.fetcher);
        let token = self.cancel.child_token();
        let tx = outcomes.clone();
        let epoch = self.epoch;

        debug!(index, epoch, segment = %strip_locator(&resolved.url), "Fetching segment");
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!(index, epoch, "Segment fetch cancelled");
                }
                result = fetcher.fetch(&resolved) => {
                    // The engine may be gone; nothing to report to then.
                    let _ = tx.send(FetchOutcome { epoch, index, result });
                }
            }
        });

        Ok(())
    }

    /// Record a fetch result for this session.
    pub fn complete(&mut self, index: usize, audio: SegmentAudio) {
        self.in_flight.remove(&index);
        self.buffered.insert(index, audio);
    }

    /// Forget a failed fetch so a later request starts a new one.
    pub fn fail(&mut self, index: usize) {
        self.in_flight.remove(&index);
    }

    /// Cancel in-flight fetches and drop buffered audio. Results of the
    /// cancelled fetches carry the old epoch and are ignored.
    pub fn reset(&mut self, epoch: u64) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.in_flight.clear();
        self.buffered.clear();
        self.epoch = epoch;
    }
}

impl Drop for SegmentSource {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for SegmentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentSource")
            .field("segments", &self.descriptors.len())
            .field("buffered", &self.buffered.len())
            .field("in_flight", &self.in_flight.len())
            .field("epoch", &self.epoch)
            .finish()
    }
}
