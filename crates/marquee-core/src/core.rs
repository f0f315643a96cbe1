//! Core: owns the containers, tracks the active one and hosts core plugins
//!
//! ```text
//!              Core ──── core plugins (dvr, ...)
//!               │
//!     ┌─────────┴─────────┐
//!  Container*          Container
//!     │                    │
//!  Playback ── container plugins (spinner, ...)
//!
//!  * active container: its playback swaps are re-announced by the core as
//!    willChangeActivePlayback / didChangeActivePlayback
//! ```

use crate::container::Container;
use crate::events::{Event, EventDispatcher, EventProtocol, ListenId};
use crate::loader::Loader;
use crate::playback::Playback;
use crate::plugin::{self, Plugin, PluginContext, PluginKind};
use crate::{Options, Result};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, instrument, warn};

/// Root of the composition graph
pub struct Core {
    events: EventDispatcher,
    this: Weak<Core>,
    loader: Rc<Loader>,
    options: RefCell<Options>,
    containers: RefCell<Vec<Rc<Container>>>,
    active_container: RefCell<Option<Rc<Container>>>,
    plugins: RefCell<Vec<Rc<dyn Plugin>>>,
    /// Core subscriptions on the active container
    container_bindings: RefCell<Vec<ListenId>>,
}

impl Core {
    /// Build a core with one active container for `options`, then attach the
    /// loader's core plugins.
    pub fn new(loader: Rc<Loader>, options: Options) -> Result<Rc<Self>> {
        let core = Rc::new_cyclic(|this| Self {
            events: EventDispatcher::new("core"),
            this: this.clone(),
            loader: Rc::clone(&loader),
            options: RefCell::new(options.clone()),
            containers: RefCell::new(Vec::new()),
            active_container: RefCell::new(None),
            plugins: RefCell::new(Vec::new()),
            container_bindings: RefCell::new(Vec::new()),
        });

        let container = Container::new(Rc::clone(&loader), options)?;
        core.add_container(Rc::clone(&container));
        core.set_active_container(container);

        for descriptor in loader.plugins(PluginKind::Core) {
            let attached = descriptor
                .build(PluginContext::Core(Rc::downgrade(&core)))
                .and_then(|plugin| core.add_plugin(plugin));
            if let Err(err) = attached {
                warn!(plugin = descriptor.name(), error = %err, "Plugin failed to attach");
                core.destroy();
                return Err(err);
            }
        }

        Ok(core)
    }

    pub fn loader(&self) -> Rc<Loader> {
        Rc::clone(&self.loader)
    }

    pub fn options(&self) -> Options {
        self.options.borrow().clone()
    }

    /// Replace the options on the core and every container
    pub fn configure(&self, options: Options) {
        *self.options.borrow_mut() = options.clone();
        for container in self.containers() {
            container.configure(options.clone());
        }
        self.trigger(Event::DidUpdateOptions);
    }

    pub fn containers(&self) -> Vec<Rc<Container>> {
        self.containers.borrow().clone()
    }

    pub fn add_container(&self, container: Rc<Container>) {
        self.containers.borrow_mut().push(container);
    }

    pub fn active_container(&self) -> Option<Rc<Container>> {
        self.active_container.borrow().clone()
    }

    pub fn active_playback(&self) -> Option<Rc<dyn Playback>> {
        self.active_container().map(|container| container.playback())
    }

    /// Make `container` active, rebinding core plugins before
    /// `didChangeActiveContainer`. Setting the current container again is a no-op.
    pub fn set_active_container(&self, container: Rc<Container>) {
        if let Some(current) = self.active_container() {
            if Rc::ptr_eq(&current, &container) {
                return;
            }
        }

        self.trigger(Event::WillChangeActiveContainer);

        for id in self.container_bindings.take() {
            self.stop_listening_to(id);
        }
        *self.active_container.borrow_mut() = Some(Rc::clone(&container));
        self.bind_active_container(&container);

        for plugin in self.plugins() {
            plugin::rebind(plugin.as_ref());
        }
        self.trigger(Event::DidChangeActiveContainer);
        for plugin in self.plugins() {
            plugin.on_did_change_active_container();
        }
    }

    fn bind_active_container(&self, container: &Rc<Container>) {
        let this = self.this.clone();
        let will = self.listen_to(container, Event::WillChangePlayback, move |_| {
            if let Some(core) = this.upgrade() {
                core.trigger(Event::WillChangeActivePlayback);
            }
        });

        let this = self.this.clone();
        let did = self.listen_to(container, Event::DidChangePlayback, move |_| {
            if let Some(core) = this.upgrade() {
                core.on_active_playback_changed();
            }
        });

        self.container_bindings.borrow_mut().extend([will, did]);
    }

    fn on_active_playback_changed(&self) {
        for plugin in self.plugins() {
            plugin::rebind(plugin.as_ref());
        }
        self.trigger(Event::DidChangeActivePlayback);
        for plugin in self.plugins() {
            plugin.on_did_change_playback();
        }
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

    /// Attach and bind a core plugin
    pub fn add_plugin(&self, plugin: Rc<dyn Plugin>) -> Result<()> {
        plugin::validate(plugin.as_ref(), PluginKind::Core, &self.plugins.borrow())?;
        debug!(plugin = plugin.name(), "Attaching core plugin");
        plugin.bind_events();
        self.plugins.borrow_mut().push(plugin);
        Ok(())
    }

    /// Load `source` into the active container
    pub fn load(&self, source: &str, mime_type: Option<&str>) -> Result<()> {
        match self.active_container() {
            Some(container) => container.load(source, mime_type),
            None => Ok(()),
        }
    }

    /// Apply queued engine telemetry on every container
    pub fn pump(&self) -> usize {
        self.containers()
            .iter()
            .map(|container| container.pump())
            .sum()
    }

    pub fn is_destroyed(&self) -> bool {
        self.events.is_destroyed()
    }

    #[instrument(skip(self))]
    pub fn destroy(&self) {
        if self.events.is_destroyed() {
            return;
        }
        debug!("Destroying core");
        self.trigger(Event::WillDestroy);

        let containers = std::mem::take(&mut *self.containers.borrow_mut());
        for container in containers {
            container.destroy();
        }
        self.active_container.borrow_mut().take();

        let plugins = std::mem::take(&mut *self.plugins.borrow_mut());
        for plugin in plugins {
            plugin.destroy();
        }

        self.trigger(Event::DidDestroy);
        self.stop_listening();
        self.events.destroy();
    }
}

impl EventProtocol for Core {
    fn events(&self) -> &EventDispatcher {
        &self.events
    }
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("containers", &self.containers.borrow().len())
            .field("plugins", &self.plugins.borrow().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventInfo;
    use crate::playback::{MediaEngine, TelemetrySink};
    use crate::plugin::{DvrPlugin, PluginDescriptor};
    use std::cell::Cell;
    use url::Url;

    struct NullEngine;

    impl MediaEngine for NullEngine {
        fn attach(&mut self, _source: &Url, _telemetry: TelemetrySink) -> Result<()> {
            Ok(())
        }
        fn play(&mut self) {}
        fn pause(&mut self) {}
        fn seek(&mut self, _to: f64) {}
        fn set_muted(&mut self, _muted: bool) {}
        fn release(&mut self) {}
    }

    fn loader() -> Rc<Loader> {
        Rc::new(Loader::with_engine(|| Box::new(NullEngine) as Box<dyn MediaEngine>))
    }

    fn mp4() -> Options {
        Options::new().with("sourceUrl", "https://cdn.example.com/movie.mp4")
    }

    #[test]
    fn test_new_core_has_active_container_and_plugins() {
        let core = Core::new(loader(), mp4()).unwrap();
        assert_eq!(core.containers().len(), 1);
        assert_eq!(core.active_playback().unwrap().name(), "AVPlayback");
        assert!(core.plugin(DvrPlugin::NAME).is_some());
    }

    #[test]
    fn test_container_swap_emits_one_pair() {
        let core = Core::new(loader(), mp4()).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        for event in [Event::WillChangeActiveContainer, Event::DidChangeActiveContainer] {
            let log = Rc::clone(&log);
            core.on(event, move |_| log.borrow_mut().push(event.to_string()));
        }

        let next = Container::new(core.loader(), mp4()).unwrap();
        core.add_container(Rc::clone(&next));
        core.set_active_container(Rc::clone(&next));
        core.set_active_container(next);

        assert_eq!(
            *log.borrow(),
            vec!["willChangeActiveContainer", "didChangeActiveContainer"]
        );
    }

    #[test]
    fn test_forwards_active_playback_swaps_only() {
        let core = Core::new(loader(), mp4()).unwrap();
        let first = core.active_container().unwrap();
        let forwarded = Rc::new(Cell::new(0));
        let count = Rc::clone(&forwarded);
        core.on(Event::DidChangeActivePlayback, move |_| count.set(count.get() + 1));

        first.load("https://cdn.example.com/other.m3u8", None).unwrap();
        assert_eq!(forwarded.get(), 1);

        let next = Container::new(core.loader(), mp4()).unwrap();
        core.add_container(Rc::clone(&next));
        core.set_active_container(next);

        first.load("https://cdn.example.com/third.mp4", None).unwrap();
        assert_eq!(forwarded.get(), 1);
    }

    #[test]
    fn test_dvr_plugin_follows_active_playback() {
        let core = Core::new(loader(), mp4()).unwrap();
        let detections = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&detections);
        core.on(Event::DetectDvr, move |info: &EventInfo| {
            seen.borrow_mut().push(info.bool("dvrEnabled"))
        });

        let old = core.active_playback().unwrap();
        core.load("https://cdn.example.com/live.m3u8", None).unwrap();
        assert_eq!(detections.borrow().len(), 1);

        old.trigger(Event::SeekableUpdate);
        assert_eq!(detections.borrow().len(), 1);

        core.active_playback().unwrap().trigger(Event::SeekableUpdate);
        assert_eq!(*detections.borrow(), vec![Some(false), Some(false)]);
    }

    #[test]
    fn test_wrong_context_fails_construction() {
        let mut registry = Loader::with_engine(|| Box::new(NullEngine) as Box<dyn MediaEngine>);
        registry
            .register_plugins([PluginDescriptor::core("misplaced", |context| {
                Ok(crate::plugin::SpinnerPlugin::new(context)? as Rc<dyn Plugin>)
            })])
            .unwrap();

        let err = Core::new(Rc::new(registry), mp4()).unwrap_err();
        assert_eq!(err.error_code(), "WRONG_CONTEXT_TYPE");
    }

    #[test]
    fn test_destroy_tears_down_graph() {
        let core = Core::new(loader(), mp4()).unwrap();
        let container = core.active_container().unwrap();

        core.destroy();

        assert!(core.is_destroyed());
        assert!(container.is_destroyed());
        assert!(core.containers().is_empty());
        assert!(core.active_playback().is_none());
    }
}
