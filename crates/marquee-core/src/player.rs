//! Player facade
//!
//! Wraps a [`Core`] and re-triggers the active playback's events on itself,
//! so integrators can subscribe once and keep receiving `playing`, `didPause`
//! and the rest across source changes.

use crate::core::Core;
use crate::events::{Event, EventDispatcher, EventProtocol, ListenId};
use crate::loader::Loader;
use crate::playback::{Playback, PlaybackState, PlaybackType};
use crate::plugin::Plugin;
use crate::{Options, Result};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, info, instrument};

pub struct Player {
    events: EventDispatcher,
    this: Weak<Player>,
    core: Rc<Core>,
    playback_bindings: RefCell<Vec<ListenId>>,
}

impl Player {
    pub fn new(loader: Rc<Loader>, options: Options) -> Result<Rc<Self>> {
        let core = Core::new(loader, options)?;
        let player = Rc::new_cyclic(|this| Self {
            events: EventDispatcher::new("player"),
            this: this.clone(),
            core,
            playback_bindings: RefCell::new(Vec::new()),
        });
        player.bind_core_events();
        player.bind_playback_events();
        info!(version = crate::VERSION, "Player ready");
        Ok(player)
    }

    fn bind_core_events(&self) {
        for event in [Event::WillChangeActivePlayback, Event::WillChangeActiveContainer] {
            let this = self.this.clone();
            self.listen_to(&self.core, event, move |_| {
                if let Some(player) = this.upgrade() {
                    player.unbind_playback_events();
                }
            });
        }
        for event in [Event::DidChangeActivePlayback, Event::DidChangeActiveContainer] {
            let this = self.this.clone();
            self.listen_to(&self.core, event, move |_| {
                if let Some(player) = this.upgrade() {
                    player.bind_playback_events();
                }
            });
        }
    }

    fn bind_playback_events(&self) {
        self.unbind_playback_events();
        let Some(playback) = self.core.active_playback() else {
            return;
        };

        let mut ids = Vec::with_capacity(Event::PLAYBACK_EVENTS.len());
        for event in Event::PLAYBACK_EVENTS {
            let this = self.this.clone();
            ids.push(self.listen_to(&playback, event, move |info| {
                if let Some(player) = this.upgrade() {
                    player.trigger_with(event, info.clone());
                }
            }));
        }
        debug!(playback = playback.name(), "Forwarding playback events");
        *self.playback_bindings.borrow_mut() = ids;
    }

    fn unbind_playback_events(&self) {
        for id in self.playback_bindings.take() {
            self.stop_listening_to(id);
        }
    }

    pub fn core(&self) -> Rc<Core> {
        Rc::clone(&self.core)
    }

    pub fn active_playback(&self) -> Option<Rc<dyn Playback>> {
        self.core.active_playback()
    }

    /// Plugin by name, searching core plugins first, then the active container's
    pub fn plugin(&self, name: &str) -> Option<Rc<dyn Plugin>> {
        self.core.plugin(name).or_else(|| {
            self.core
                .active_container()
                .and_then(|container| container.plugin(name))
        })
    }

    /// Replace the options everywhere and load `sourceUrl` when present
    pub fn configure(&self, options: Options) -> Result<()> {
        let source = options.source_url().map(str::to_string);
        let mime_type = options.mime_type().map(str::to_string);
        self.core.configure(options);
        match source {
            Some(source) => self.load(&source, mime_type.as_deref()),
            None => Ok(()),
        }
    }

    #[instrument(skip(self))]
    pub fn load(&self, source: &str, mime_type: Option<&str>) -> Result<()> {
        self.core.load(source, mime_type)
    }

    pub fn play(&self) {
        self.with_playback(|playback| playback.play());
    }

    pub fn pause(&self) {
        self.with_playback(|playback| playback.pause());
    }

    pub fn stop(&self) {
        self.with_playback(|playback| playback.stop());
    }

    pub fn seek(&self, position: f64) {
        self.with_playback(|playback| playback.seek(position));
    }

    pub fn seek_to_live_position(&self) {
        self.with_playback(|playback| playback.seek_to_live_position());
    }

    pub fn set_muted(&self, muted: bool) {
        self.with_playback(|playback| playback.set_muted(muted));
    }

    pub fn state(&self) -> PlaybackState {
        self.active_playback()
            .map_or(PlaybackState::Idle, |playback| playback.state())
    }

    pub fn playback_type(&self) -> PlaybackType {
        self.active_playback()
            .map_or(PlaybackType::Unknown, |playback| playback.playback_type())
    }

    pub fn position(&self) -> f64 {
        self.active_playback().map_or(0.0, |playback| playback.position())
    }

    pub fn duration(&self) -> f64 {
        self.active_playback().map_or(0.0, |playback| playback.duration())
    }

    pub fn is_dvr_available(&self) -> bool {
        self.active_playback()
            .is_some_and(|playback| playback.is_dvr_available())
    }

    pub fn is_dvr_in_use(&self) -> bool {
        self.active_playback()
            .is_some_and(|playback| playback.is_dvr_in_use())
    }

    /// Apply queued engine telemetry; returns the number of messages handled
    pub fn pump(&self) -> usize {
        self.core.pump()
    }

    pub fn destroy(&self) {
        if self.events.is_destroyed() {
            return;
        }
        debug!("Destroying player");
        self.unbind_playback_events();
        self.stop_listening();
        self.core.destroy();
        self.events.destroy();
    }

    fn with_playback(&self, command: impl FnOnce(&dyn Playback)) {
        if let Some(playback) = self.active_playback() {
            command(playback.as_ref());
        }
    }
}

impl EventProtocol for Player {
    fn events(&self) -> &EventDispatcher {
        &self.events
    }
}
