use super::{Plugin, PluginContext, PluginDescriptor, PluginKind};
use crate::container::Container;
use crate::events::{Event, EventDispatcher, EventProtocol};
use crate::Result;
use std::any::Any;
use std::cell::Cell;
use std::rc::{Rc, Weak};
use tracing::trace;

const START_EVENTS: [Event; 2] = [Event::WillPlay, Event::Stalled];

const STOP_EVENTS: [Event; 5] = [
    Event::Playing,
    Event::DidPause,
    Event::DidStop,
    Event::DidComplete,
    Event::Error,
];

/// Tracks whether a loading indicator should be animating
pub struct SpinnerPlugin {
    events: EventDispatcher,
    container: Weak<Container>,
    animating: Rc<Cell<bool>>,
}

impl SpinnerPlugin {
    pub const NAME: &'static str = "spinner";

    pub fn new(context: PluginContext) -> Result<Rc<Self>> {
        let container = context.container(Self::NAME)?;
        Ok(Rc::new(Self {
            events: EventDispatcher::new(Self::NAME),
            container,
            animating: Rc::new(Cell::new(false)),
        }))
    }

    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::container(Self::NAME, |context| {
            Ok(Self::new(context)? as Rc<dyn Plugin>)
        })
    }

    pub fn is_animating(&self) -> bool {
        self.animating.get()
    }
}

impl EventProtocol for SpinnerPlugin {
    fn events(&self) -> &EventDispatcher {
        &self.events
    }
}

impl Plugin for SpinnerPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> PluginKind {
        PluginKind::Container
    }

    fn bind_events(&self) {
        let Some(container) = self.container.upgrade() else {
            return;
        };
        let playback = container.playback();

        for (events, animating) in [(&START_EVENTS[..], true), (&STOP_EVENTS[..], false)] {
            for event in events {
                let flag = Rc::clone(&self.animating);
                self.listen_to(&playback, event, move |_| {
                    trace!(animating, "Spinner");
                    flag.set(animating);
                });
            }
        }
    }

    fn on_did_change_playback(&self) {
        self.animating.set(false);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
