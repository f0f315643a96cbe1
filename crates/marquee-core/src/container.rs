//! Container: owns one active playback and the plugins that watch it

use crate::events::{Event, EventDispatcher, EventInfo, EventProtocol, ListenId};
use crate::loader::Loader;
use crate::options::{MIME_TYPE, SOURCE_URL, START_AT};
use crate::playback::{NoOpPlayback, Playback};
use crate::plugin::{self, Plugin, PluginContext, PluginKind};
use crate::{Options, Result};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, info, instrument, warn};

/// Holds the active [`Playback`] for one source
pub struct Container {
    events: EventDispatcher,
    this: Weak<Container>,
    loader: Rc<Loader>,
    options: RefCell<Options>,
    playback: RefCell<Rc<dyn Playback>>,
    plugins: RefCell<Vec<Rc<dyn Plugin>>>,
    start_at_reset: Cell<Option<ListenId>>,
}

impl Container {
    /// Build a container, attach the loader's container plugins and load
    /// `sourceUrl` when present.
    ///
    /// A plugin that cannot attach fails construction. A source that no
    /// playback can play does not: the container keeps a [`NoOpPlayback`].
    pub fn new(loader: Rc<Loader>, options: Options) -> Result<Rc<Self>> {
        let container = Rc::new_cyclic(|this| Self {
            events: EventDispatcher::new("container"),
            this: this.clone(),
            loader: Rc::clone(&loader),
            playback: RefCell::new(NoOpPlayback::new(options.clone()) as Rc<dyn Playback>),
            options: RefCell::new(options),
            plugins: RefCell::new(Vec::new()),
            start_at_reset: Cell::new(None),
        });

        for descriptor in loader.plugins(PluginKind::Container) {
            let attached = descriptor
                .build(PluginContext::Container(Rc::downgrade(&container)))
                .and_then(|plugin| container.add_plugin(plugin));
            if let Err(err) = attached {
                warn!(plugin = descriptor.name(), error = %err, "Plugin failed to attach");
                container.destroy();
                return Err(err);
            }
        }

        let source = container.options().source_url().map(str::to_string);
        if let Some(source) = source {
            let mime_type = container.options().mime_type().map(str::to_string);
            if let Err(err) = container.load(&source, mime_type.as_deref()) {
                debug!(error = %err, "Container created without a playable source");
            }
        }

        Ok(container)
    }

    pub fn playback(&self) -> Rc<dyn Playback> {
        Rc::clone(&self.playback.borrow())
    }

    pub fn options(&self) -> Options {
        self.options.borrow().clone()
    }

    /// Replace the options and announce `didUpdateOptions`
    pub fn configure(&self, options: Options) {
        *self.options.borrow_mut() = options;
        self.trigger(Event::DidUpdateOptions);
    }

    pub fn plugins(&self) -> Vec<Rc<dyn Plugin>> {
        self.plugins.borrow().clone()
    }

    pub fn plugin(&self, name: &str) -> Option<Rc<dyn Plugin>> {
        self.plugins
            .borrow()
            .iter()
            .find(|plugin| plugin.name() == name)
            .cloned()
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugin(name).is_some()
    }

    /// Attach and bind a container plugin
    pub fn add_plugin(&self, plugin: Rc<dyn Plugin>) -> Result<()> {
        plugin::validate(plugin.as_ref(), PluginKind::Container, &self.plugins.borrow())?;
        debug!(plugin = plugin.name(), "Attaching container plugin");
        plugin.bind_events();
        self.plugins.borrow_mut().push(plugin);
        Ok(())
    }

    /// Select a playback for `source` and swap it in.
    ///
    /// When nothing can play the source a [`NoOpPlayback`] is swapped in,
    /// `didNotLoadSource` is triggered and `NoPlayableCandidate` returned.
    #[instrument(skip(self))]
    pub fn load(&self, source: &str, mime_type: Option<&str>) -> Result<()> {
        self.trigger(Event::WillLoadSource);

        let options = {
            let mut options = self.options.borrow_mut();
            options.set(SOURCE_URL, source);
            match mime_type {
                Some(mime_type) => options.set(MIME_TYPE, mime_type),
                None => {
                    options.remove(MIME_TYPE);
                }
            }
            options.clone()
        };

        match self.loader.select_playback(&options) {
            Ok(descriptor) => {
                info!(playback = descriptor.name(), "Loaded source");
                self.set_playback(descriptor.build(&options));
                self.trigger(Event::DidLoadSource);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "No playback can play source");
                self.set_playback(NoOpPlayback::new(options));
                self.trigger_with(
                    Event::DidNotLoadSource,
                    EventInfo::new()
                        .with("error", err.to_string())
                        .with("code", err.error_code()),
                );
                Err(err)
            }
        }
    }

    /// Swap the active playback, rebinding every plugin before `didChangePlayback`
    pub fn set_playback(&self, playback: Rc<dyn Playback>) {
        self.trigger(Event::WillChangePlayback);

        let previous = self.playback.replace(playback);
        if let Some(id) = self.start_at_reset.take() {
            self.stop_listening_to(id);
        }
        previous.destroy();
        self.reset_start_at_on_playing();

        for plugin in self.plugins() {
            plugin::rebind(plugin.as_ref());
        }
        self.trigger(Event::DidChangePlayback);
        for plugin in self.plugins() {
            plugin.on_did_change_playback();
        }
    }

    fn reset_start_at_on_playing(&self) {
        let this = self.this.clone();
        let id = self.listen_to_once(&self.playback(), Event::Playing, move |_| {
            if let Some(container) = this.upgrade() {
                container.options.borrow_mut().set(START_AT, 0.0);
            }
        });
        self.start_at_reset.set(Some(id));
    }

    /// Apply queued engine telemetry on the active playback
    pub fn pump(&self) -> usize {
        self.playback().pump()
    }

    pub fn is_destroyed(&self) -> bool {
        self.events.is_destroyed()
    }

    #[instrument(skip(self))]
    pub fn destroy(&self) {
        if self.events.is_destroyed() {
            return;
        }
        debug!("Destroying container");
        self.trigger(Event::WillDestroy);

        self.playback().destroy();
        let plugins = std::mem::take(&mut *self.plugins.borrow_mut());
        for plugin in plugins {
            plugin.destroy();
        }

        self.trigger(Event::DidDestroy);
        self.stop_listening();
        self.events.destroy();
    }
}

impl EventProtocol for Container {
    fn events(&self) -> &EventDispatcher {
        &self.events
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("playback", &self.playback.borrow().name())
            .field("plugins", &self.plugins.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Context for plugins attached by hand
impl From<&Container> for PluginContext {
    fn from(container: &Container) -> Self {
        PluginContext::Container(container.this.clone())
    }
}
