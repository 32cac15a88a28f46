//! Mapping between track time and segment boundaries.

use crate::types::{seconds, Track};
use std::time::Duration;

/// Start offsets and lengths of every segment of one track.
///
/// Lengths come from the descriptors' duration hints. Segments without a
/// hint share whatever the declared track duration leaves over. Actual
/// lengths reported by the fetcher replace the estimates as they arrive.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTimeline {
    lengths: Vec<Duration>,
    starts: Vec<Duration>,
    total: Duration,
}

impl SegmentTimeline {
    pub fn from_track(track: &Track) -> Self {
        let hints: Vec<Option<Duration>> = track
            .segments
            .iter()
            .map(|s| s.duration.map(seconds).filter(|d| !d.is_zero()))
            .collect();

        let hinted: Duration = hints.iter().flatten().sum();
        let unhinted = hints.iter().filter(|h| h.is_none()).count();
        let share = if unhinted == 0 {
            Duration::ZERO
        } else {
            track.declared_duration().saturating_sub(hinted) / unhinted as u32
        };

        let lengths = hints.into_iter().map(|h| h.unwrap_or(share)).collect();
        let mut timeline = Self {
            lengths,
            starts: Vec::new(),
            total: Duration::ZERO,
        };
        timeline.recompute();
        timeline
    }

    fn recompute(&mut self) {
        let mut cursor = Duration::ZERO;
        self.starts = self
            .lengths
            .iter()
            .map(|len| {
                let start = cursor;
                cursor += *len;
                start
            })
            .collect();
        self.total = cursor;
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn start_of(&self, index: usize) -> Duration {
        self.starts.get(index).copied().unwrap_or(self.total)
    }

    pub fn end_of(&self, index: usize) -> Duration {
        match (self.starts.get(index), self.lengths.get(index)) {
            (Some(start), Some(len)) => *start + *len,
            _ => self.total,
        }
    }

    /// Segment containing `position` and the offset into it, or `None` at or
    /// past the end of the track.
    pub fn locate(&self, position: Duration) -> Option<(usize, Duration)> {
        if position >= self.total {
            return None;
        }
        // Zero-length segments are skipped: `end_of` of such a segment equals
        // its start, so the first segment whose end lies past `position` wins.
        let index = self
            .starts
            .iter()
            .zip(&self.lengths)
            .position(|(start, len)| position < *start + *len)?;
        Some((index, position - self.starts[index]))
    }

    /// Replace a segment's length with the measured one. Returns whether the
    /// total changed.
    pub fn refine(&mut self, index: usize, actual: Duration) -> bool {
        match self.lengths.get_mut(index) {
            Some(len) if !actual.is_zero() && *len != actual => {
                *len = actual;
                let before = self.total;
                self.recompute();
                before != self.total
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::SegmentDescriptor;

    fn track(hints: &[Option<f64>], duration: f64) -> Track {
        let segments = hints
            .iter()
            .enumerate()
            .map(|(i, h)| SegmentDescriptor {
                locator: format!("Qm{}", i),
                duration: *h,
            })
            .collect();
        Track::new(1, segments, duration)
    }

    #[test]
    fn even_split_without_hints() {
        let timeline = SegmentTimeline::from_track(&track(&[None, None, None], 30.0));
        assert_eq!(timeline.total(), Duration::from_secs(30));
        assert_eq!(timeline.start_of(1), Duration::from_secs(10));
        assert_eq!(timeline.end_of(2), Duration::from_secs(30));
    }

    #[test]
    fn hints_take_precedence_and_rest_is_shared() {
        let timeline = SegmentTimeline::from_track(&track(&[Some(4.0), None, None], 20.0));
        assert_eq!(timeline.end_of(0), Duration::from_secs(4));
        assert_eq!(timeline.end_of(1), Duration::from_secs(12));
        assert_eq!(timeline.total(), Duration::from_secs(20));
    }

    #[test]
    fn fully_hinted_track_uses_hint_sum() {
        let timeline = SegmentTimeline::from_track(&track(&[Some(6.0), Some(6.5)], 10.0));
        assert_eq!(timeline.total(), Duration::from_millis(12_500));
    }

    #[test]
    fn locate_maps_positions_to_segments() {
        let timeline = SegmentTimeline::from_track(&track(&[None, None, None], 30.0));
        assert_eq!(timeline.locate(Duration::ZERO), Some((0, Duration::ZERO)));
        assert_eq!(
            timeline.locate(Duration::from_secs(15)),
            Some((1, Duration::from_secs(5)))
        );
        assert_eq!(
            timeline.locate(Duration::from_secs(20)),
            Some((2, Duration::ZERO))
        );
        assert_eq!(timeline.locate(Duration::from_secs(30)), None);
    }

    #[test]
    fn refine_shifts_later_segments() {
        let mut timeline = SegmentTimeline::from_track(&track(&[None, None], 20.0));
        assert!(timeline.refine(0, Duration::from_secs(12)));
        assert_eq!(timeline.start_of(1), Duration::from_secs(12));
        assert_eq!(timeline.total(), Duration::from_secs(22));

        assert!(!timeline.refine(0, Duration::from_secs(12)));
        assert!(!timeline.refine(5, Duration::from_secs(1)));
        assert!(!timeline.refine(1, Duration::ZERO));
    }
}
