use super::{Plugin, PluginContext, PluginDescriptor, PluginKind};
use crate::core::Core;
use crate::events::{Event, EventDispatcher, EventInfo, EventProtocol};
use crate::playback::Playback;
use crate::Result;
use std::any::Any;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Announces DVR capability of the active playback as `detectDVR` on the core
pub struct DvrPlugin {
    events: EventDispatcher,
    core: Weak<Core>,
}

impl DvrPlugin {
    pub const NAME: &'static str = "dvr";

    pub fn new(context: PluginContext) -> Result<Rc<Self>> {
        let core = context.core(Self::NAME)?;
        Ok(Rc::new(Self {
            events: EventDispatcher::new(Self::NAME),
            core,
        }))
    }

    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::core(Self::NAME, |context| Ok(Self::new(context)? as Rc<dyn Plugin>))
    }
}

fn detect(core: &Weak<Core>, playback: &Weak<dyn Playback>) {
    let (Some(core), Some(playback)) = (core.upgrade(), playback.upgrade()) else {
        return;
    };
    let enabled = playback.is_dvr_available();
    debug!(enabled, "Detected DVR");
    core.trigger_with(
        Event::DetectDvr,
        EventInfo::new()
            .with("dvrEnabled", enabled)
            .with("duration", playback.duration()),
    );
}

impl EventProtocol for DvrPlugin {
    fn events(&self) -> &EventDispatcher {
        &self.events
    }
}

impl Plugin for DvrPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> PluginKind {
        PluginKind::Core
    }

    fn bind_events(&self) {
        let Some(playback) = self.core.upgrade().and_then(|core| core.active_playback()) else {
            return;
        };
        let weak_playback = Rc::downgrade(&playback);

        for event in [Event::SeekableUpdate, Event::DidChangeDvrAvailability] {
            let core = self.core.clone();
            let weak_playback = weak_playback.clone();
            self.listen_to(&playback, event, move |_| detect(&core, &weak_playback));
        }
        detect(&self.core, &weak_playback);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
