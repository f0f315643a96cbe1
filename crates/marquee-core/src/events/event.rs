//! Well-known event names

use serde::{Deserialize, Serialize};

/// Events exchanged between playbacks, containers, cores and plugins.
///
/// Dispatchers are keyed by plain strings, so plugins may also trigger their
/// own names; these are the ones the core itself emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Event {
    // Playback lifecycle
    Ready,
    Error,
    WillPlay,
    Playing,
    WillPause,
    DidPause,
    WillStop,
    DidStop,
    Stalled,
    DidComplete,
    WillSeek,
    Seek,
    DidSeek,
    DidUpdatePosition,
    DidUpdateBuffer,
    DidUpdateDuration,
    SeekableUpdate,
    DidChangeDvrStatus,
    DidChangeDvrAvailability,
    #[serde(rename = "detectDVR")]
    DetectDvr,

    // Composition
    DidUpdateOptions,
    WillLoadSource,
    DidLoadSource,
    DidNotLoadSource,
    WillChangePlayback,
    DidChangePlayback,
    WillChangeActiveContainer,
    DidChangeActiveContainer,
    WillChangeActivePlayback,
    DidChangeActivePlayback,
    WillDestroy,
    DidDestroy,
}

impl Event {
    /// Playback events the `Player` facade re-triggers on itself
    pub const PLAYBACK_EVENTS: [Event; 16] = [
        Event::Ready,
        Event::Error,
        Event::WillPlay,
        Event::Playing,
        Event::WillPause,
        Event::DidPause,
        Event::WillStop,
        Event::DidStop,
        Event::Stalled,
        Event::DidComplete,
        Event::WillSeek,
        Event::DidSeek,
        Event::DidUpdatePosition,
        Event::DidUpdateBuffer,
        Event::DidUpdateDuration,
        Event::DidChangeDvrStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Ready => "ready",
            Event::Error => "error",
            Event::WillPlay => "willPlay",
            Event::Playing => "playing",
            Event::WillPause => "willPause",
            Event::DidPause => "didPause",
            Event::WillStop => "willStop",
            Event::DidStop => "didStop",
            Event::Stalled => "stalled",
            Event::DidComplete => "didComplete",
            Event::WillSeek => "willSeek",
            Event::Seek => "seek",
            Event::DidSeek => "didSeek",
            Event::DidUpdatePosition => "didUpdatePosition",
            Event::DidUpdateBuffer => "didUpdateBuffer",
            Event::DidUpdateDuration => "didUpdateDuration",
            Event::SeekableUpdate => "seekableUpdate",
            Event::DidChangeDvrStatus => "didChangeDvrStatus",
            Event::DidChangeDvrAvailability => "didChangeDvrAvailability",
            Event::DetectDvr => "detectDVR",
            Event::DidUpdateOptions => "didUpdateOptions",
            Event::WillLoadSource => "willLoadSource",
            Event::DidLoadSource => "didLoadSource",
            Event::DidNotLoadSource => "didNotLoadSource",
            Event::WillChangePlayback => "willChangePlayback",
            Event::DidChangePlayback => "didChangePlayback",
            Event::WillChangeActiveContainer => "willChangeActiveContainer",
            Event::DidChangeActiveContainer => "didChangeActiveContainer",
            Event::WillChangeActivePlayback => "willChangeActivePlayback",
            Event::DidChangeActivePlayback => "didChangeActivePlayback",
            Event::WillDestroy => "willDestroy",
            Event::DidDestroy => "didDestroy",
        }
    }
}

impl AsRef<str> for Event {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names_match_display() {
        for event in [Event::DidPause, Event::DetectDvr, Event::DidChangeActiveContainer] {
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, format!("\"{}\"", event));
        }
    }
}
