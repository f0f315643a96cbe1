//! Plugin contract
//!
//! Plugins attach behaviour to a [`Container`] or a [`Core`] without those
//! types knowing about them. A plugin only ever talks to its context through
//! events, and its cross-entity subscriptions live in its own ledger so the
//! owner can rebind it with `stop_listening()` + `bind_events()` whenever the
//! objects it listens to are replaced.

mod dvr;
mod spinner;

pub use dvr::DvrPlugin;
pub use spinner::SpinnerPlugin;

use crate::container::Container;
use crate::core::Core;
use crate::events::EventProtocol;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::rc::{Rc, Weak};

/// Which owner a plugin attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    Container,
    Core,
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginKind::Container => write!(f, "container"),
            PluginKind::Core => write!(f, "core"),
        }
    }
}

/// Owner handed to a plugin when it is built
#[derive(Debug, Clone)]
pub enum PluginContext {
    Container(Weak<Container>),
    Core(Weak<Core>),
}

impl PluginContext {
    pub fn kind(&self) -> PluginKind {
        match self {
            PluginContext::Container(_) => PluginKind::Container,
            PluginContext::Core(_) => PluginKind::Core,
        }
    }

    /// The container context, or `WrongContextType` naming `plugin`
    pub fn container(&self, plugin: &str) -> Result<Weak<Container>> {
        match self {
            PluginContext::Container(container) => Ok(container.clone()),
            PluginContext::Core(_) => Err(Error::WrongContextType {
                plugin: plugin.to_string(),
                expected: PluginKind::Container,
            }),
        }
    }

    /// The core context, or `WrongContextType` naming `plugin`
    pub fn core(&self, plugin: &str) -> Result<Weak<Core>> {
        match self {
            PluginContext::Core(core) => Ok(core.clone()),
            PluginContext::Container(_) => Err(Error::WrongContextType {
                plugin: plugin.to_string(),
                expected: PluginKind::Core,
            }),
        }
    }
}

/// Behaviour attached to a container or a core
pub trait Plugin: EventProtocol {
    fn name(&self) -> &str;

    fn kind(&self) -> PluginKind;

    /// Subscribe to the current context. Called again after every
    /// `stop_listening()`, so it must not assume a fresh plugin.
    fn bind_events(&self);

    fn on_did_change_playback(&self) {}

    fn on_did_change_active_container(&self) {}

    fn destroy(&self) {
        self.stop_listening();
        self.events().destroy();
    }

    fn as_any(&self) -> &dyn Any;
}

/// Drop every cross-entity subscription of `plugin` and bind it again
pub(crate) fn rebind(plugin: &dyn Plugin) {
    plugin.stop_listening();
    plugin.bind_events();
}

/// Check a freshly built plugin against the owner it is attaching to
pub(crate) fn validate(
    plugin: &dyn Plugin,
    owner: PluginKind,
    attached: &[Rc<dyn Plugin>],
) -> Result<()> {
    if plugin.name().is_empty() {
        return Err(Error::MissingPluginName { kind: owner });
    }
    if plugin.kind() != owner {
        return Err(Error::WrongContextType {
            plugin: plugin.name().to_string(),
            expected: owner,
        });
    }
    if attached.iter().any(|other| other.name() == plugin.name()) {
        return Err(Error::DuplicatePlugin {
            kind: owner,
            name: plugin.name().to_string(),
        });
    }
    Ok(())
}

type PluginBuilder = Rc<dyn Fn(PluginContext) -> Result<Rc<dyn Plugin>>>;

/// Registration record for a plugin
#[derive(Clone)]
pub struct PluginDescriptor {
    kind: PluginKind,
    name: String,
    build: PluginBuilder,
}

impl PluginDescriptor {
    pub fn new<F>(kind: PluginKind, name: impl Into<String>, build: F) -> Self
    where
        F: Fn(PluginContext) -> Result<Rc<dyn Plugin>> + 'static,
    {
        Self {
            kind,
            name: name.into(),
            build: Rc::new(build),
        }
    }

    pub fn container<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(PluginContext) -> Result<Rc<dyn Plugin>> + 'static,
    {
        Self::new(PluginKind::Container, name, build)
    }

    pub fn core<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(PluginContext) -> Result<Rc<dyn Plugin>> + 'static,
    {
        Self::new(PluginKind::Core, name, build)
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build(&self, context: PluginContext) -> Result<Rc<dyn Plugin>> {
        (self.build)(context)
    }
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
