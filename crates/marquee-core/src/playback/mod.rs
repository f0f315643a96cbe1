//! Playback: commands one media engine and turns its telemetry into states
//!
//! A playback variant is registered with the [`Loader`](crate::Loader)
//! through a [`PlaybackDescriptor`], which carries the static `can_play`
//! predicate used for capability-based selection.

mod av;
pub mod dvr;
mod noop;
mod state;
pub mod telemetry;

pub use av::AvPlayback;
pub use dvr::{DvrPolicy, DvrWindow};
pub use noop::NoOpPlayback;
pub use state::{StateMachine, Transition};
pub use telemetry::{
    AssetDuration, ItemStatus, MediaEngine, Telemetry, TelemetryReceiver, TelemetrySink,
    TelemetrySnapshot, TimeRange,
};

use crate::events::EventProtocol;
use crate::options::Options;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Playback state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Initial state, and the state after stop or completion
    #[default]
    Idle,
    Paused,
    Playing,
    /// Waiting for the engine to buffer enough data
    Buffering,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Buffering => write!(f, "buffering"),
        }
    }
}

/// Kind of content, derived from the asset duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackType {
    /// Asset not loaded yet
    #[default]
    Unknown,
    Vod,
    Live,
}

impl std::fmt::Display for PlaybackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackType::Unknown => write!(f, "unknown"),
            PlaybackType::Vod => write!(f, "vod"),
            PlaybackType::Live => write!(f, "live"),
        }
    }
}

/// Common surface of every playback variant
pub trait Playback: EventProtocol {
    /// Canonical plugin name, e.g. `"AVPlayback"`
    fn name(&self) -> &str;

    fn options(&self) -> Options;

    fn source(&self) -> Option<String> {
        self.options().source_url().map(str::to_string)
    }

    fn state(&self) -> PlaybackState;

    fn playback_type(&self) -> PlaybackType;

    /// Seconds; 0 when unknown
    fn duration(&self) -> f64;

    /// Seconds, relative to the DVR window start while DVR is available
    fn position(&self) -> f64;

    fn is_dvr_available(&self) -> bool {
        false
    }

    fn is_dvr_in_use(&self) -> bool {
        false
    }

    fn dvr_window(&self) -> Option<DvrWindow> {
        None
    }

    fn play(&self);

    fn pause(&self);

    fn stop(&self);

    /// Fire-and-forget seek
    fn seek(&self, position: f64);

    fn seek_to_live_position(&self);

    fn set_muted(&self, muted: bool);

    /// Apply telemetry queued by the engine; returns the number of messages handled
    fn pump(&self) -> usize {
        0
    }

    fn destroy(&self);
}

type PlaybackBuilder = Rc<dyn Fn(&Options) -> Rc<dyn Playback>>;

/// Registration record for a playback variant
#[derive(Clone)]
pub struct PlaybackDescriptor {
    name: String,
    can_play: fn(&Options) -> bool,
    build: PlaybackBuilder,
}

impl PlaybackDescriptor {
    pub fn new<F>(name: impl Into<String>, can_play: fn(&Options) -> bool, build: F) -> Self
    where
        F: Fn(&Options) -> Rc<dyn Playback> + 'static,
    {
        Self {
            name: name.into(),
            can_play,
            build: Rc::new(build),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn can_play(&self, options: &Options) -> bool {
        (self.can_play)(options)
    }

    pub fn build(&self, options: &Options) -> Rc<dyn Playback> {
        (self.build)(options)
    }
}

impl std::fmt::Debug for PlaybackDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
