//! Marquee Core - Pluggable media player composition
//!
//! This crate provides the object graph behind a media player:
//! - Hierarchical publish/subscribe event bus with cross-entity listener ledgers
//! - Core → Container → Playback composition with plugin rebinding
//! - Capability-based playback selection
//! - Playback state machine driven by engine telemetry, including live DVR
//! - Built-in spinner and DVR plugins
//!
//! The media engine itself is supplied by the integrator through
//! [`MediaEngine`]; engines report back through a `Send` [`TelemetrySink`]
//! and the coordinating thread applies the telemetry with `pump()`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Marquee Core                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │                    ┌──────────────┐                             │
//! │                    │    Player    │  re-triggers playback events│
//! │                    └──────┬───────┘                             │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴───────┐  ┌──────────────┐           │
//! │  │    Loader    │──│     Core     │──│ Core plugins │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────────────┘           │
//! │         │                 │                                     │
//! │         │          ┌──────┴───────┐  ┌──────────────┐           │
//! │         └──────────│  Container   │──│  Container   │           │
//! │                    └──────┬───────┘  │   plugins    │           │
//! │                           │          └──────────────┘           │
//! │                    ┌──────┴───────┐                             │
//! │                    │   Playback   │◄── Telemetry ◄── Engine     │
//! │                    └──────────────┘                             │
//! │                                                                 │
//! │            all of the above speak through EventDispatcher       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod container;
pub mod core;
pub mod error;
pub mod events;
pub mod loader;
pub mod options;
pub mod playback;
pub mod player;
pub mod plugin;

pub use crate::core::Core;
pub use container::Container;
pub use error::{Error, Result};
pub use events::{Event, EventDispatcher, EventInfo, EventProtocol, ListenId};
pub use loader::{unique_by_name, Loader};
pub use options::Options;
pub use playback::{
    AvPlayback, DvrPolicy, DvrWindow, MediaEngine, NoOpPlayback, Playback, PlaybackDescriptor,
    PlaybackState, PlaybackType, Telemetry, TelemetrySink, TimeRange,
};
pub use player::Player;
pub use plugin::{DvrPlugin, Plugin, PluginContext, PluginDescriptor, PluginKind, SpinnerPlugin};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() {
    tracing::info!(version = VERSION, "Marquee Core initialized");
}
