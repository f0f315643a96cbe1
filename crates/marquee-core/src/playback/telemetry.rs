//! Engine-facing boundary: commands go out through [`MediaEngine`], state
//! comes back as [`Telemetry`] pushed into a [`TelemetrySink`].
//!
//! The sink is `Send` so engines may report from their own threads. Nothing
//! touches playback state until the coordinating thread drains the matching
//! [`TelemetryReceiver`] via `Playback::pump`.

use super::PlaybackType;
use crate::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use url::Url;

/// Time range in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub duration: f64,
}

impl TimeRange {
    pub fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Readiness of the current item
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ItemStatus {
    #[default]
    Unknown,
    ReadyToPlay,
    Failed(String),
}

/// Duration reported by the asset
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AssetDuration {
    /// Not loaded yet
    #[default]
    Unknown,
    /// Live stream
    Indefinite,
    Finite(f64),
}

/// Inbound notification from the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Telemetry {
    StatusChanged(ItemStatus),
    DurationChanged(AssetDuration),
    LoadedRangesChanged(Vec<TimeRange>),
    SeekableRangesChanged(Vec<TimeRange>),
    LikelyToKeepUp(bool),
    BufferEmpty(bool),
    RateChanged(f64),
    /// Periodic playhead report, in seconds
    PositionTick(f64),
    ItemDidFinish,
    SeekCompleted { success: bool },
}

/// Latest values reported by the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub status: ItemStatus,
    pub asset_duration: AssetDuration,
    pub current_time: f64,
    pub rate: f64,
    pub likely_to_keep_up: bool,
    pub buffer_empty: bool,
    pub loaded_ranges: Vec<TimeRange>,
    pub seekable_ranges: Vec<TimeRange>,
}

impl TelemetrySnapshot {
    pub fn playback_type(&self) -> PlaybackType {
        match self.asset_duration {
            AssetDuration::Unknown => PlaybackType::Unknown,
            AssetDuration::Indefinite => PlaybackType::Live,
            AssetDuration::Finite(_) => PlaybackType::Vod,
        }
    }
}

/// Sending half handed to the engine on attach
#[derive(Debug, Clone)]
pub struct TelemetrySink(mpsc::UnboundedSender<Telemetry>);

impl TelemetrySink {
    /// Queue a notification; returns false once the playback is gone
    pub fn send(&self, telemetry: Telemetry) -> bool {
        self.0.send(telemetry).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// Receiving half, drained on the coordinating thread
#[derive(Debug)]
pub struct TelemetryReceiver(mpsc::UnboundedReceiver<Telemetry>);

impl TelemetryReceiver {
    /// Everything queued so far, without waiting
    pub fn drain(&mut self) -> Vec<Telemetry> {
        let mut batch = Vec::new();
        while let Ok(telemetry) = self.0.try_recv() {
            batch.push(telemetry);
        }
        batch
    }
}

/// Create a connected sink/receiver pair
pub fn channel() -> (TelemetrySink, TelemetryReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TelemetrySink(tx), TelemetryReceiver(rx))
}

/// The media decode/render engine behind an [`AvPlayback`](super::AvPlayback)
pub trait MediaEngine {
    /// Open `source` and start reporting into `telemetry`
    fn attach(&mut self, source: &Url, telemetry: TelemetrySink) -> Result<()>;

    fn play(&mut self);

    fn pause(&mut self);

    /// Absolute engine time in seconds
    fn seek(&mut self, to: f64);

    fn set_muted(&mut self, muted: bool);

    fn release(&mut self);
}
