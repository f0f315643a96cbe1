use super::{Playback, PlaybackState, PlaybackType};
use crate::events::{EventDispatcher, EventProtocol};
use crate::options::{Options, PLAYBACK_NOT_SUPPORTED_MESSAGE};
use std::rc::Rc;
use tracing::debug;

const DEFAULT_MESSAGE: &str = "Could not play video";

/// Placeholder used when no registered playback can play the source
pub struct NoOpPlayback {
    events: EventDispatcher,
    options: Options,
}

impl NoOpPlayback {
    pub const NAME: &'static str = "NoOp";

    pub fn new(options: Options) -> Rc<Self> {
        Rc::new(Self {
            events: EventDispatcher::new(Self::NAME),
            options,
        })
    }

    /// Message to show in place of the video
    pub fn message(&self) -> &str {
        self.options
            .string(PLAYBACK_NOT_SUPPORTED_MESSAGE)
            .unwrap_or(DEFAULT_MESSAGE)
    }
}

impl EventProtocol for NoOpPlayback {
    fn events(&self) -> &EventDispatcher {
        &self.events
    }
}

impl Playback for NoOpPlayback {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn options(&self) -> Options {
        self.options.clone()
    }

    fn state(&self) -> PlaybackState {
        PlaybackState::Idle
    }

    fn playback_type(&self) -> PlaybackType {
        PlaybackType::Unknown
    }

    fn duration(&self) -> f64 {
        0.0
    }

    fn position(&self) -> f64 {
        0.0
    }

    fn play(&self) {
        debug!(reason = self.message(), "Ignoring play on unsupported source");
    }

    fn pause(&self) {}

    fn stop(&self) {}

    fn seek(&self, _position: f64) {}

    fn seek_to_live_position(&self) {}

    fn set_muted(&self, _muted: bool) {}

    fn destroy(&self) {
        self.events.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use std::cell::Cell;

    #[test]
    fn test_message_defaults() {
        assert_eq!(NoOpPlayback::new(Options::new()).message(), "Could not play video");

        let options = Options::new().with(PLAYBACK_NOT_SUPPORTED_MESSAGE, "Unsupported");
        assert_eq!(NoOpPlayback::new(options).message(), "Unsupported");
    }

    #[test]
    fn test_play_never_emits_playing() {
        let playback = NoOpPlayback::new(Options::new().with("sourceUrl", "not-a-url"));
        let played = Rc::new(Cell::new(false));
        let flag = Rc::clone(&played);
        playback.on(Event::Playing, move |_| flag.set(true));

        playback.play();
        playback.seek(10.0);

        assert!(!played.get());
        assert_eq!(playback.state(), PlaybackState::Idle);
        assert_eq!(playback.name(), "NoOp");
    }
}
