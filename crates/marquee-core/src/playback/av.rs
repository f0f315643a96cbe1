//! Engine-backed playback
//!
//! Converts raw engine telemetry into the small ordered set of playback
//! states and events:
//! - buffering flags drive `stalled` / `playing`
//! - rate changes drive `playing` / `didPause`
//! - time ranges drive buffer, seekable and DVR notifications
//! - item end drives completion and optional looping

use super::dvr::{self, DvrPolicy, DvrWindow};
use super::state::StateMachine;
use super::telemetry::{
    self, AssetDuration, ItemStatus, MediaEngine, Telemetry, TelemetryReceiver, TelemetrySink,
    TelemetrySnapshot, TimeRange,
};
use super::{Playback, PlaybackDescriptor, PlaybackState, PlaybackType};
use crate::events::{Event, EventDispatcher, EventInfo, EventProtocol};
use crate::options::Options;
use crate::Error;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, error, info, instrument, trace};
use url::Url;

/// Distance from the asset end, in seconds, at which an item counts as complete
const COMPLETION_TOLERANCE: f64 = 2.0;

/// File extension to MIME type
const MIME_TYPES: [(&str, &str); 2] = [("mp4", "video/mp4"), ("m3u8", "application/x-mpegurl")];

const PLAYABLE_MIME_TYPES: [&str; 3] = [
    "video/mp4",
    "application/x-mpegurl",
    "application/vnd.apple.mpegurl",
];

type EngineFactory = Rc<dyn Fn() -> Box<dyn MediaEngine>>;

/// Playback driving a [`MediaEngine`]
pub struct AvPlayback {
    events: EventDispatcher,
    options: Options,
    policy: DvrPolicy,
    engine_factory: EngineFactory,
    engine: RefCell<Option<Box<dyn MediaEngine>>>,
    sink: TelemetrySink,
    receiver: RefCell<TelemetryReceiver>,
    snapshot: RefCell<TelemetrySnapshot>,
    machine: RefCell<StateMachine>,
    /// Absolute seek target parked until the item is ready
    pending_seek: Cell<Option<f64>>,
    last_dvr_availability: Cell<Option<bool>>,
    /// Bumped on every engine release
    generation: Cell<u64>,
}

impl AvPlayback {
    pub const NAME: &'static str = "AVPlayback";

    pub fn new<F>(options: Options, engine_factory: F) -> Rc<Self>
    where
        F: Fn() -> Box<dyn MediaEngine> + 'static,
    {
        Self::with_factory(options, Rc::new(engine_factory))
    }

    fn with_factory(options: Options, engine_factory: EngineFactory) -> Rc<Self> {
        let (sink, receiver) = telemetry::channel();
        Rc::new(Self {
            events: EventDispatcher::new(Self::NAME),
            policy: DvrPolicy::from_options(&options),
            options,
            engine_factory,
            engine: RefCell::new(None),
            sink,
            receiver: RefCell::new(receiver),
            snapshot: RefCell::new(TelemetrySnapshot::default()),
            machine: RefCell::new(StateMachine::new()),
            pending_seek: Cell::new(None),
            last_dvr_availability: Cell::new(None),
            generation: Cell::new(0),
        })
    }

    /// Registration record building playbacks around engines from `engine_factory`
    pub fn descriptor<F>(engine_factory: F) -> PlaybackDescriptor
    where
        F: Fn() -> Box<dyn MediaEngine> + 'static,
    {
        let engine_factory: EngineFactory = Rc::new(engine_factory);
        PlaybackDescriptor::new(Self::NAME, Self::can_play, move |options| {
            Self::with_factory(options.clone(), Rc::clone(&engine_factory)) as Rc<dyn Playback>
        })
    }

    /// Whether the source, or the `mimeType` override, is a supported media type
    pub fn can_play(options: &Options) -> bool {
        let mime_type = match options.mime_type() {
            Some(mime_type) => Some(mime_type.to_ascii_lowercase()),
            None => options
                .source_url()
                .and_then(|source| Url::parse(source).ok())
                .and_then(|url| mime_type_for(&url))
                .map(str::to_string),
        };
        mime_type.is_some_and(|mime_type| PLAYABLE_MIME_TYPES.contains(&mime_type.as_str()))
    }

    /// Latest engine values
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.snapshot.borrow().clone()
    }

    fn setup_engine(&self) -> bool {
        let source = self.options.source_url().and_then(|source| Url::parse(source).ok());
        let Some(source) = source else {
            let err = Error::InvalidConfig(format!(
                "invalid source url {:?}",
                self.options.source_url()
            ));
            error!(error = %err, "Cannot attach engine");
            self.trigger_error(&err);
            return false;
        };

        let mut engine = (self.engine_factory)();
        match engine.attach(&source, self.sink.clone()) {
            Ok(()) => {
                info!(source = %source, "Engine attached");
                *self.engine.borrow_mut() = Some(engine);
                self.trigger(Event::Ready);
                true
            }
            Err(err) => {
                error!(source = %source, error = %err, "Engine attach failed");
                self.trigger_error(&err);
                false
            }
        }
    }

    fn with_engine(&self, command: impl FnOnce(&mut dyn MediaEngine)) {
        if let Some(engine) = self.engine.borrow_mut().as_deref_mut() {
            command(engine);
        }
    }

    fn release_engine(&self) {
        let engine = self.engine.borrow_mut().take();
        if let Some(mut engine) = engine {
            engine.release();
            debug!("Engine released");
        }
        // anything still queued belongs to the released item
        let stale = self.receiver.borrow_mut().drain();
        if !stale.is_empty() {
            trace!(count = stale.len(), "Dropped stale telemetry");
        }
        self.generation.set(self.generation.get().wrapping_add(1));
        *self.snapshot.borrow_mut() = TelemetrySnapshot::default();
        self.pending_seek.set(None);
        self.last_dvr_availability.set(None);
    }

    fn trigger_error(&self, err: &Error) {
        self.trigger_with(
            Event::Error,
            EventInfo::new()
                .with("error", err.to_string())
                .with("code", err.error_code()),
        );
    }

    fn update_state(&self, next: PlaybackState) {
        let transition = self.machine.borrow_mut().transition(next);
        let Some(transition) = transition else {
            return;
        };
        debug!(from = %transition.from, to = %transition.to, "State transition");

        if let Some(event) = transition.event {
            self.trigger(event);
        }
        if next == PlaybackState::Paused {
            self.trigger_dvr_status();
        }
    }

    fn trigger_dvr_status(&self) {
        if self.is_dvr_available() {
            self.trigger_with(
                Event::DidChangeDvrStatus,
                EventInfo::new().with("inUse", self.is_dvr_in_use()),
            );
        }
    }

    fn seek_absolute(&self, target: f64) {
        if self.snapshot.borrow().status != ItemStatus::ReadyToPlay {
            debug!(target, "Item not ready, parking seek");
            self.pending_seek.set(Some(target));
            return;
        }

        self.trigger(Event::WillSeek);
        self.trigger_with(Event::Seek, EventInfo::new().with("position", target));
        self.with_engine(|engine| engine.seek(target));
        self.trigger_with(
            Event::DidUpdatePosition,
            EventInfo::new().with("position", target),
        );
    }

    fn handle(&self, telemetry: Telemetry) {
        trace!(?telemetry, "Telemetry");
        match telemetry {
            Telemetry::StatusChanged(status) => self.handle_status(status),
            Telemetry::DurationChanged(duration) => {
                self.snapshot.borrow_mut().asset_duration = duration;
                self.trigger_with(
                    Event::DidUpdateDuration,
                    EventInfo::new().with("duration", self.duration()),
                );
            }
            Telemetry::LoadedRangesChanged(ranges) => self.handle_loaded_ranges(ranges),
            Telemetry::SeekableRangesChanged(ranges) => self.handle_seekable_ranges(ranges),
            Telemetry::LikelyToKeepUp(likely) => {
                self.snapshot.borrow_mut().likely_to_keep_up = likely;
                if self.state() == PlaybackState::Paused {
                    return;
                }
                if !likely {
                    self.update_state(PlaybackState::Buffering);
                } else if self.state() == PlaybackState::Buffering {
                    self.update_state(PlaybackState::Playing);
                }
            }
            Telemetry::BufferEmpty(empty) => {
                self.snapshot.borrow_mut().buffer_empty = empty;
                if empty && self.state() != PlaybackState::Paused {
                    self.update_state(PlaybackState::Buffering);
                }
            }
            Telemetry::RateChanged(rate) => {
                let status_known = {
                    let mut snapshot = self.snapshot.borrow_mut();
                    snapshot.rate = rate;
                    snapshot.status != ItemStatus::Unknown
                };
                if rate > 0.0 {
                    self.update_state(PlaybackState::Playing);
                } else if status_known && self.state() != PlaybackState::Idle {
                    self.update_state(PlaybackState::Paused);
                }
            }
            Telemetry::PositionTick(time) => {
                let rate = {
                    let mut snapshot = self.snapshot.borrow_mut();
                    snapshot.current_time = time;
                    snapshot.rate
                };
                if rate > 0.0 {
                    self.update_state(PlaybackState::Playing);
                    self.trigger_with(
                        Event::DidUpdatePosition,
                        EventInfo::new().with("position", self.position()),
                    );
                }
            }
            Telemetry::ItemDidFinish => self.handle_item_did_finish(),
            Telemetry::SeekCompleted { success } => {
                if success {
                    self.trigger(Event::DidSeek);
                    self.trigger_dvr_status();
                } else {
                    debug!("Seek interrupted");
                }
            }
        }
    }

    fn handle_status(&self, status: ItemStatus) {
        {
            let mut snapshot = self.snapshot.borrow_mut();
            if snapshot.status == status {
                return;
            }
            snapshot.status = status.clone();
        }

        match status {
            ItemStatus::ReadyToPlay => {
                if self.state() == PlaybackState::Paused {
                    return;
                }
                match self.pending_seek.take() {
                    Some(target) => self.seek_absolute(target),
                    None => {
                        if let Some(start_at) = self.options.start_at().filter(|at| *at > 0.0) {
                            debug!(start_at, "Seeking to start position");
                            self.seek(start_at);
                        }
                    }
                }
            }
            ItemStatus::Failed(reason) => {
                error!(reason = %reason, "Item failed");
                self.trigger_error(&Error::engine(reason));
            }
            ItemStatus::Unknown => {}
        }
    }

    fn handle_loaded_ranges(&self, ranges: Vec<TimeRange>) {
        let first = ranges.first().copied();
        self.snapshot.borrow_mut().loaded_ranges = ranges;
        if let Some(range) = first {
            self.trigger_with(
                Event::DidUpdateBuffer,
                EventInfo::new()
                    .with("start_position", range.start)
                    .with("end_position", range.end())
                    .with("duration", self.duration()),
            );
        }
    }

    fn handle_seekable_ranges(&self, ranges: Vec<TimeRange>) {
        if ranges.is_empty() {
            return;
        }
        let pairs: Vec<Value> = ranges
            .iter()
            .map(|range| json!([range.start, range.end()]))
            .collect();
        self.snapshot.borrow_mut().seekable_ranges = ranges;
        self.trigger_with(
            Event::SeekableUpdate,
            EventInfo::new().with("seekableTimeRanges", pairs),
        );

        let available = self.is_dvr_available();
        if self.last_dvr_availability.replace(Some(available)) != Some(available) {
            self.trigger_with(
                Event::DidChangeDvrAvailability,
                EventInfo::new().with("available", available),
            );
        }
    }

    fn handle_item_did_finish(&self) {
        let finished = {
            let snapshot = self.snapshot.borrow();
            match snapshot.asset_duration {
                AssetDuration::Finite(duration) => {
                    (duration - snapshot.current_time).abs() <= COMPLETION_TOLERANCE
                }
                _ => false,
            }
        };
        if !finished {
            trace!("Item end outside completion tolerance");
            return;
        }

        info!("Playback complete");
        self.trigger(Event::DidComplete);
        self.update_state(PlaybackState::Idle);

        if self.options.is_loop() && !self.events.is_destroyed() {
            debug!("Looping");
            self.seek_absolute(0.0);
            self.play();
        }
    }
}

impl EventProtocol for AvPlayback {
    fn events(&self) -> &EventDispatcher {
        &self.events
    }
}

impl Playback for AvPlayback {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn options(&self) -> Options {
        self.options.clone()
    }

    fn state(&self) -> PlaybackState {
        self.machine.borrow().state()
    }

    fn playback_type(&self) -> PlaybackType {
        self.snapshot.borrow().playback_type()
    }

    fn duration(&self) -> f64 {
        let snapshot = self.snapshot.borrow();
        match (snapshot.playback_type(), snapshot.asset_duration) {
            (PlaybackType::Vod, AssetDuration::Finite(duration)) => duration,
            (PlaybackType::Live, _) => dvr::live_duration(&snapshot.seekable_ranges),
            _ => 0.0,
        }
    }

    fn position(&self) -> f64 {
        if let Some(window) = self.dvr_window() {
            return self.snapshot.borrow().current_time - window.start;
        }
        let snapshot = self.snapshot.borrow();
        match snapshot.playback_type() {
            PlaybackType::Vod => snapshot.current_time,
            _ => 0.0,
        }
    }

    fn is_dvr_available(&self) -> bool {
        dvr::is_available(self.playback_type(), self.duration(), &self.policy)
    }

    fn is_dvr_in_use(&self) -> bool {
        let duration = self.duration();
        let snapshot = self.snapshot.borrow();
        dvr::is_in_use(
            self.state(),
            snapshot.playback_type(),
            duration,
            &snapshot.seekable_ranges,
            snapshot.current_time,
            &self.policy,
        )
    }

    fn dvr_window(&self) -> Option<DvrWindow> {
        let duration = self.duration();
        let snapshot = self.snapshot.borrow();
        dvr::window(
            snapshot.playback_type(),
            duration,
            &snapshot.seekable_ranges,
            &self.policy,
        )
    }

    #[instrument(skip(self), fields(source = ?self.options.source_url()))]
    fn play(&self) {
        let attached = self.engine.borrow().is_some();
        if !attached && !self.setup_engine() {
            return;
        }

        self.trigger(Event::WillPlay);
        self.with_engine(|engine| engine.play());

        if !self.snapshot.borrow().likely_to_keep_up {
            self.update_state(PlaybackState::Buffering);
        }
    }

    #[instrument(skip(self))]
    fn pause(&self) {
        self.trigger(Event::WillPause);
        self.with_engine(|engine| engine.pause());
        self.update_state(PlaybackState::Paused);
    }

    #[instrument(skip(self))]
    fn stop(&self) {
        self.trigger(Event::WillStop);
        self.with_engine(|engine| engine.pause());
        self.update_state(PlaybackState::Idle);
        self.release_engine();
        self.trigger(Event::DidStop);
    }

    #[instrument(skip(self))]
    fn seek(&self, position: f64) {
        let target = match self.dvr_window() {
            Some(window) => window.start + position,
            None => position,
        };
        self.seek_absolute(target);
    }

    #[instrument(skip(self))]
    fn seek_to_live_position(&self) {
        self.play();
        let live_head = dvr::window_end(&self.snapshot.borrow().seekable_ranges);
        match live_head {
            Some(live_head) => self.seek_absolute(live_head),
            None => debug!("No seekable range, already at the live head"),
        }
    }

    fn set_muted(&self, muted: bool) {
        self.with_engine(|engine| engine.set_muted(muted));
    }

    fn pump(&self) -> usize {
        let batch = self.receiver.borrow_mut().drain();
        let count = batch.len();
        let generation = self.generation.get();
        for telemetry in batch {
            if self.events.is_destroyed() {
                break;
            }
            if self.generation.get() != generation {
                trace!("Engine released mid-batch, dropping the rest");
                break;
            }
            self.handle(telemetry);
        }
        count
    }

    fn destroy(&self) {
        debug!(playback = Self::NAME, "Destroying playback");
        self.release_engine();
        self.events.destroy();
    }
}

fn mime_type_for(url: &Url) -> Option<&'static str> {
    let extension = Path::new(url.path()).extension()?.to_str()?.to_ascii_lowercase();
    MIME_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime_type)| *mime_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Engine double recording commands and exposing its telemetry sink
    #[derive(Clone, Default)]
    struct FakeEngine {
        commands: Arc<Mutex<Vec<String>>>,
        sink: Arc<Mutex<Option<TelemetrySink>>>,
        fail_attach: bool,
    }

    impl FakeEngine {
        fn send(&self, telemetry: Telemetry) {
            let sink = self.sink.lock().unwrap();
            sink.as_ref().unwrap().send(telemetry);
        }

        fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl MediaEngine for FakeEngine {
        fn attach(&mut self, source: &Url, telemetry: TelemetrySink) -> crate::Result<()> {
            if self.fail_attach {
                return Err(Error::engine("no decoder"));
            }
            self.commands.lock().unwrap().push(format!("attach {source}"));
            *self.sink.lock().unwrap() = Some(telemetry);
            Ok(())
        }

        fn play(&mut self) {
            self.commands.lock().unwrap().push("play".into());
        }

        fn pause(&mut self) {
            self.commands.lock().unwrap().push("pause".into());
        }

        fn seek(&mut self, to: f64) {
            self.commands.lock().unwrap().push(format!("seek {to}"));
        }

        fn set_muted(&mut self, muted: bool) {
            self.commands.lock().unwrap().push(format!("muted {muted}"));
        }

        fn release(&mut self) {
            self.commands.lock().unwrap().push("release".into());
        }
    }

    fn playback(source: &str, engine: &FakeEngine) -> Rc<AvPlayback> {
        let engine = engine.clone();
        AvPlayback::new(Options::new().with("sourceUrl", source), move || {
            Box::new(engine.clone()) as Box<dyn MediaEngine>
        })
    }

    fn record(playback: &AvPlayback, events: &[Event]) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for event in events {
            let log = Rc::clone(&log);
            let name = event.to_string();
            playback.on(*event, move |_| log.borrow_mut().push(name.clone()));
        }
        log
    }

    const STATE_EVENTS: [Event; 6] = [
        Event::Playing,
        Event::Stalled,
        Event::DidPause,
        Event::DidStop,
        Event::DidComplete,
        Event::Error,
    ];

    #[test]
    fn test_can_play_by_extension_and_mime_type() {
        let source = |url: &str| Options::new().with("sourceUrl", url);
        assert!(AvPlayback::can_play(&source("https://cdn.example.com/movie.mp4")));
        assert!(AvPlayback::can_play(&source("https://cdn.example.com/live/index.M3U8?t=1")));
        assert!(!AvPlayback::can_play(&source("https://cdn.example.com/movie.avi")));
        assert!(!AvPlayback::can_play(&source("not-a-url")));
        assert!(AvPlayback::can_play(
            &source("https://cdn.example.com/stream").with("mimeType", "application/x-mpegURL")
        ));
    }

    #[test]
    fn test_play_attaches_then_buffers() {
        let engine = FakeEngine::default();
        let playback = playback("https://cdn.example.com/movie.mp4", &engine);
        let log = record(&playback, &[Event::Ready, Event::WillPlay, Event::Stalled]);

        playback.play();

        assert_eq!(*log.borrow(), vec!["ready", "willPlay", "stalled"]);
        assert_eq!(playback.state(), PlaybackState::Buffering);
        assert_eq!(
            engine.commands(),
            vec!["attach https://cdn.example.com/movie.mp4", "play"]
        );
    }

    #[test]
    fn test_attach_failure_emits_error() {
        let engine = FakeEngine {
            fail_attach: true,
            ..FakeEngine::default()
        };
        let playback = playback("https://cdn.example.com/movie.mp4", &engine);
        let codes = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&codes);
        playback.on(Event::Error, move |info| {
            seen.borrow_mut().push(info.str("code").unwrap_or_default().to_string())
        });

        playback.play();

        assert_eq!(*codes.borrow(), vec!["ENGINE"]);
        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_buffer_healthy_twice_emits_playing_once() {
        let engine = FakeEngine::default();
        let playback = playback("https://cdn.example.com/movie.mp4", &engine);
        playback.play();
        let log = record(&playback, &STATE_EVENTS);

        engine.send(Telemetry::LikelyToKeepUp(true));
        engine.send(Telemetry::LikelyToKeepUp(true));
        playback.pump();

        assert_eq!(*log.borrow(), vec!["playing"]);
    }

    #[test]
    fn test_rate_changes_pause_then_resume() {
        let engine = FakeEngine::default();
        let playback = playback("https://cdn.example.com/movie.mp4", &engine);
        playback.play();
        engine.send(Telemetry::StatusChanged(ItemStatus::ReadyToPlay));
        engine.send(Telemetry::RateChanged(1.0));
        playback.pump();
        let log = record(&playback, &STATE_EVENTS);

        engine.send(Telemetry::RateChanged(0.0));
        engine.send(Telemetry::RateChanged(1.0));
        engine.send(Telemetry::PositionTick(3.0));
        playback.pump();

        assert_eq!(*log.borrow(), vec!["didPause", "playing"]);
    }

    #[test]
    fn test_buffering_ignored_while_paused() {
        let engine = FakeEngine::default();
        let playback = playback("https://cdn.example.com/movie.mp4", &engine);
        playback.play();
        playback.pause();
        let log = record(&playback, &STATE_EVENTS);

        engine.send(Telemetry::BufferEmpty(true));
        engine.send(Telemetry::LikelyToKeepUp(false));
        playback.pump();

        assert!(log.borrow().is_empty());
        assert_eq!(playback.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_stop_releases_engine() {
        let engine = FakeEngine::default();
        let playback = playback("https://cdn.example.com/movie.mp4", &engine);
        playback.play();
        engine.send(Telemetry::DurationChanged(AssetDuration::Finite(30.0)));
        let log = record(&playback, &[Event::WillStop, Event::DidStop]);

        playback.stop();

        assert_eq!(*log.borrow(), vec!["willStop", "didStop"]);
        assert_eq!(playback.state(), PlaybackState::Idle);
        assert_eq!(playback.playback_type(), PlaybackType::Unknown);
        assert_eq!(engine.commands().last().map(String::as_str), Some("release"));
        // queued telemetry from the released item is discarded
        assert_eq!(playback.pump(), 0);
    }

    #[test]
    fn test_stop_from_listener_drops_rest_of_batch() {
        let engine = FakeEngine::default();
        let playback = playback("https://cdn.example.com/movie.mp4", &engine);
        playback.play();
        engine.send(Telemetry::StatusChanged(ItemStatus::ReadyToPlay));
        engine.send(Telemetry::DurationChanged(AssetDuration::Finite(60.0)));
        engine.send(Telemetry::RateChanged(1.0));

        let weak = Rc::downgrade(&playback);
        playback.once(Event::DidUpdateDuration, move |_| {
            if let Some(playback) = weak.upgrade() {
                playback.stop();
            }
        });
        let log = record(&playback, &[Event::DidStop, Event::Playing]);

        playback.pump();

        assert_eq!(*log.borrow(), vec!["didStop"]);
        assert_eq!(playback.state(), PlaybackState::Idle);
        assert_eq!(playback.playback_type(), PlaybackType::Unknown);
    }

    #[test]
    fn test_vod_never_reports_dvr_in_use() {
        let engine = FakeEngine::default();
        let playback = playback("https://cdn.example.com/movie.mp4", &engine);
        playback.play();
        engine.send(Telemetry::StatusChanged(ItemStatus::ReadyToPlay));
        engine.send(Telemetry::DurationChanged(AssetDuration::Finite(600.0)));
        engine.send(Telemetry::SeekableRangesChanged(vec![TimeRange::new(0.0, 600.0)]));
        engine.send(Telemetry::RateChanged(1.0));
        engine.send(Telemetry::PositionTick(10.0));
        playback.pump();

        assert_eq!(playback.playback_type(), PlaybackType::Vod);
        assert!(!playback.is_dvr_available());
        assert!(!playback.is_dvr_in_use());
    }

    #[test]
    fn test_seek_parked_until_ready() {
        let engine = FakeEngine::default();
        let playback = playback("https://cdn.example.com/movie.mp4", &engine);
        playback.play();
        let log = record(&playback, &[Event::WillSeek, Event::Seek, Event::DidSeek]);

        playback.seek(12.0);
        assert!(log.borrow().is_empty());

        engine.send(Telemetry::StatusChanged(ItemStatus::ReadyToPlay));
        engine.send(Telemetry::SeekCompleted { success: true });
        playback.pump();

        assert_eq!(*log.borrow(), vec!["willSeek", "seek", "didSeek"]);
        assert!(engine.commands().contains(&"seek 12".to_string()));
    }

    #[test]
    fn test_start_at_applied_when_ready() {
        let engine = FakeEngine::default();
        let options = Options::new()
            .with("sourceUrl", "https://cdn.example.com/movie.mp4")
            .with("startAt", "42");
        let factory = engine.clone();
        let playback = AvPlayback::new(options, move || {
            Box::new(factory.clone()) as Box<dyn MediaEngine>
        });
        playback.play();

        engine.send(Telemetry::StatusChanged(ItemStatus::ReadyToPlay));
        playback.pump();

        assert!(engine.commands().contains(&"seek 42".to_string()));
    }

    #[test]
    fn test_completion_within_tolerance() {
        let engine = FakeEngine::default();
        let playback = playback("https://cdn.example.com/movie.mp4", &engine);
        playback.play();
        engine.send(Telemetry::DurationChanged(AssetDuration::Finite(60.0)));
        engine.send(Telemetry::RateChanged(1.0));
        engine.send(Telemetry::PositionTick(50.0));
        engine.send(Telemetry::ItemDidFinish);
        playback.pump();
        assert_ne!(playback.state(), PlaybackState::Idle);

        let log = record(&playback, &STATE_EVENTS);
        engine.send(Telemetry::PositionTick(59.0));
        engine.send(Telemetry::ItemDidFinish);
        playback.pump();

        assert_eq!(*log.borrow(), vec!["didComplete"]);
        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_live_dvr_queries() {
        let engine = FakeEngine::default();
        let playback = playback("https://cdn.example.com/live.m3u8", &engine);
        let availability = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&availability);
        playback.on(Event::DidChangeDvrAvailability, move |info| {
            seen.borrow_mut().push(info.bool("available"))
        });

        playback.play();
        engine.send(Telemetry::DurationChanged(AssetDuration::Indefinite));
        engine.send(Telemetry::SeekableRangesChanged(vec![TimeRange::new(880.0, 120.0)]));
        engine.send(Telemetry::SeekableRangesChanged(vec![TimeRange::new(881.0, 120.0)]));
        engine.send(Telemetry::PositionTick(990.0));
        playback.pump();

        assert_eq!(playback.playback_type(), PlaybackType::Live);
        assert_eq!(playback.duration(), 120.0);
        assert!(playback.is_dvr_available());
        assert_eq!(
            playback.dvr_window(),
            Some(DvrWindow {
                start: 881.0,
                end: 1001.0
            })
        );
        assert_eq!(playback.position(), 109.0);
        assert!(playback.is_dvr_in_use());
        assert_eq!(*availability.borrow(), vec![Some(true)]);
    }

    #[test]
    fn test_engine_failure_keeps_state() {
        let engine = FakeEngine::default();
        let playback = playback("https://cdn.example.com/movie.mp4", &engine);
        playback.play();
        let log = record(&playback, &STATE_EVENTS);

        engine.send(Telemetry::StatusChanged(ItemStatus::Failed("decode".into())));
        playback.pump();

        assert_eq!(*log.borrow(), vec!["error"]);
        assert_eq!(playback.state(), PlaybackState::Buffering);
    }

    #[test]
    fn test_destroyed_playback_ignores_telemetry() {
        let engine = FakeEngine::default();
        let playback = playback("https://cdn.example.com/movie.mp4", &engine);
        playback.play();
        let sink = engine.sink.lock().unwrap().clone().unwrap();

        playback.destroy();
        sink.send(Telemetry::LikelyToKeepUp(true));

        assert_eq!(playback.pump(), 1);
        assert_eq!(playback.state(), PlaybackState::Buffering);
    }
}
