//! Live DVR window arithmetic
//!
//! For live content the seekable ranges describe a sliding window behind the
//! live head. The window is only exposed as DVR once it is at least
//! `min_dvr_size` seconds long.
//!
//! ```text
//!   window_start                         window_end (live head)
//!        |<------------- duration ------------>|
//!        |                       |<-tolerance->|
//!                                ^ beyond this point the viewer is "live"
//! ```

use super::{PlaybackState, PlaybackType, TimeRange};
use crate::options::Options;
use serde::{Deserialize, Serialize};

/// Smallest live window, in seconds, treated as DVR
pub const DEFAULT_MIN_DVR_SIZE: f64 = 60.0;

/// Distance from the live head, in seconds, still considered live
pub const LIVE_HEAD_TOLERANCE: f64 = 5.0;

/// DVR thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DvrPolicy {
    pub min_dvr_size: f64,
    pub live_head_tolerance: f64,
}

impl Default for DvrPolicy {
    fn default() -> Self {
        Self {
            min_dvr_size: DEFAULT_MIN_DVR_SIZE,
            live_head_tolerance: LIVE_HEAD_TOLERANCE,
        }
    }
}

impl DvrPolicy {
    /// Defaults, with `minDvrSize` taken from `options` when present
    pub fn from_options(options: &Options) -> Self {
        Self {
            min_dvr_size: options.min_dvr_size().unwrap_or(DEFAULT_MIN_DVR_SIZE),
            ..Self::default()
        }
    }
}

/// Seekable live window, in absolute engine seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DvrWindow {
    pub start: f64,
    pub end: f64,
}

impl DvrWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Live duration: the summed length of the seekable ranges
pub fn live_duration(ranges: &[TimeRange]) -> f64 {
    ranges.iter().map(|range| range.duration).sum()
}

/// Live head: the largest seekable range end
pub fn window_end(ranges: &[TimeRange]) -> Option<f64> {
    ranges.iter().map(TimeRange::end).reduce(f64::max)
}

pub fn is_available(playback_type: PlaybackType, duration: f64, policy: &DvrPolicy) -> bool {
    playback_type == PlaybackType::Live && duration >= policy.min_dvr_size
}

pub fn window(
    playback_type: PlaybackType,
    duration: f64,
    ranges: &[TimeRange],
    policy: &DvrPolicy,
) -> Option<DvrWindow> {
    if !is_available(playback_type, duration, policy) {
        return None;
    }
    let end = window_end(ranges)?;
    Some(DvrWindow {
        start: end - duration,
        end,
    })
}

/// Whether the viewer is behind the live head.
///
/// Only an available DVR window can be in use. A paused DVR stream counts as
/// in use regardless of position.
pub fn is_in_use(
    state: PlaybackState,
    playback_type: PlaybackType,
    duration: f64,
    ranges: &[TimeRange],
    current_time: f64,
    policy: &DvrPolicy,
) -> bool {
    if state == PlaybackState::Paused && is_available(playback_type, duration, policy) {
        return true;
    }
    window(playback_type, duration, ranges, policy)
        .is_some_and(|window| window.end - policy.live_head_tolerance > current_time)
}
