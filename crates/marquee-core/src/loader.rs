//! Plugin and playback registry
//!
//! A [`Loader`] is built once, frozen behind an `Rc`, and handed to every
//! [`Core`](crate::Core) and [`Container`](crate::Container) that should
//! share the same set of registrations.

use crate::playback::{AvPlayback, MediaEngine, NoOpPlayback, Playback, PlaybackDescriptor};
use crate::plugin::{DvrPlugin, PluginDescriptor, PluginKind, SpinnerPlugin};
use crate::{Error, Options, Result};
use std::collections::HashSet;
use std::hash::Hash;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Remove duplicates by key; the last occurrence of each key survives and the
/// survivors keep their relative order.
pub fn unique_by_name<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    let mut kept: Vec<T> = items
        .into_iter()
        .rev()
        .filter(|item| seen.insert(key(item)))
        .collect();
    kept.reverse();
    kept
}

/// Registered playbacks and plugins
#[derive(Debug, Clone, Default)]
pub struct Loader {
    playbacks: Vec<PlaybackDescriptor>,
    plugins: Vec<PluginDescriptor>,
}

impl Loader {
    /// Empty registry; every source falls back to [`NoOpPlayback`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in playback and plugins, using engines from
    /// `engine_factory`
    pub fn with_engine<F>(engine_factory: F) -> Self
    where
        F: Fn() -> Box<dyn MediaEngine> + 'static,
    {
        Self {
            playbacks: vec![AvPlayback::descriptor(engine_factory)],
            plugins: vec![SpinnerPlugin::descriptor(), DvrPlugin::descriptor()],
        }
    }

    /// Add playbacks; a later registration replaces an earlier one with the same name
    pub fn register_playbacks(
        &mut self,
        descriptors: impl IntoIterator<Item = PlaybackDescriptor>,
    ) -> Result<()> {
        let descriptors: Vec<_> = descriptors.into_iter().collect();
        if descriptors.iter().any(|descriptor| descriptor.name().is_empty()) {
            return Err(Error::InvalidConfig(
                "playbacks should always declare a name".into(),
            ));
        }

        let mut playbacks = std::mem::take(&mut self.playbacks);
        playbacks.extend(descriptors);
        self.playbacks = unique_by_name(playbacks, |descriptor| descriptor.name().to_string());
        debug!(playbacks = ?self.playback_names(), "Registered playbacks");
        Ok(())
    }

    /// Add plugins; a later registration replaces an earlier one with the
    /// same kind and name
    pub fn register_plugins(
        &mut self,
        descriptors: impl IntoIterator<Item = PluginDescriptor>,
    ) -> Result<()> {
        let descriptors: Vec<_> = descriptors.into_iter().collect();
        if let Some(unnamed) = descriptors.iter().find(|descriptor| descriptor.name().is_empty()) {
            return Err(Error::MissingPluginName {
                kind: unnamed.kind(),
            });
        }

        let mut plugins = std::mem::take(&mut self.plugins);
        plugins.extend(descriptors);
        self.plugins = unique_by_name(plugins, |descriptor| {
            (descriptor.kind(), descriptor.name().to_string())
        });
        debug!(plugins = self.plugins.len(), "Registered plugins");
        Ok(())
    }

    pub fn playbacks(&self) -> &[PlaybackDescriptor] {
        &self.playbacks
    }

    pub fn playback_names(&self) -> Vec<&str> {
        self.playbacks.iter().map(PlaybackDescriptor::name).collect()
    }

    pub fn plugins(&self, kind: PluginKind) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins
            .iter()
            .filter(move |descriptor| descriptor.kind() == kind)
    }

    /// First registered playback able to play `options`
    pub fn select_playback(&self, options: &Options) -> Result<&PlaybackDescriptor> {
        self.playbacks
            .iter()
            .find(|descriptor| descriptor.can_play(options))
            .ok_or_else(|| Error::NoPlayableCandidate {
                url: options.source_url().map(str::to_string),
            })
    }

    /// Build the selected playback, substituting [`NoOpPlayback`] when none fits
    pub fn create_playback(&self, options: &Options) -> Rc<dyn Playback> {
        match self.select_playback(options) {
            Ok(descriptor) => {
                info!(playback = descriptor.name(), "Selected playback");
                descriptor.build(options)
            }
            Err(err) => {
                warn!(error = %err, "Falling back to NoOp playback");
                NoOpPlayback::new(options.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{MediaEngine, TelemetrySink};
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

    fn loader() -> Loader {
        Loader::with_engine(|| Box::new(NullEngine) as Box<dyn MediaEngine>)
    }

    fn source(url: &str) -> Options {
        Options::new().with("sourceUrl", url)
    }

    #[test]
    fn test_unique_by_name_keeps_last_in_order() {
        let items = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4)];
        let unique = unique_by_name(items, |(name, _)| *name);
        assert_eq!(unique, vec![("b", 2), ("a", 3), ("c", 4)]);
    }

    #[test]
    fn test_mp4_selects_av_playback() {
        let loader = loader();
        let options = source("https://cdn.example.com/movie.mp4");
        assert_eq!(loader.select_playback(&options).unwrap().name(), "AVPlayback");
        assert_eq!(loader.create_playback(&options).name(), "AVPlayback");
    }

    #[test]
    fn test_unplayable_source_falls_back_to_noop() {
        let loader = loader();
        let options = source("not-a-url");
        assert_eq!(
            loader.select_playback(&options).unwrap_err(),
            Error::NoPlayableCandidate {
                url: Some("not-a-url".into())
            }
        );
        assert_eq!(loader.create_playback(&options).name(), "NoOp");
    }

    #[test]
    fn test_later_plugin_replaces_same_kind_and_name() {
        let mut loader = loader();
        loader
            .register_plugins([PluginDescriptor::container("spinner", |context| {
                Ok(SpinnerPlugin::new(context)? as Rc<dyn crate::Plugin>)
            })])
            .unwrap();

        let names: Vec<_> = loader
            .plugins(PluginKind::Container)
            .map(PluginDescriptor::name)
            .collect();
        assert_eq!(names, vec!["spinner"]);
        assert_eq!(loader.plugins(PluginKind::Core).count(), 1);
    }

    #[test]
    fn test_unnamed_registrations_are_rejected() {
        let mut loader = Loader::new();
        let err = loader
            .register_plugins([PluginDescriptor::core("", |context| {
                Ok(DvrPlugin::new(context)? as Rc<dyn crate::Plugin>)
            })])
            .unwrap_err();
        assert_eq!(err, Error::MissingPluginName { kind: PluginKind::Core });

        let err = loader
            .register_playbacks([PlaybackDescriptor::new("", |_| true, |options| {
                NoOpPlayback::new(options.clone()) as Rc<dyn Playback>
            })])
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(loader.playbacks().is_empty());
    }
}
