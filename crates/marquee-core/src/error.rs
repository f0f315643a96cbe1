//! Error types for Marquee Core

use crate::plugin::PluginKind;
use thiserror::Error;

/// Result type alias for composition operations
pub type Result<T> = std::result::Result<T, Error>;

/// Composition and engine error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Configuration errors
    #[error("{kind} plugins should always declare a name")]
    MissingPluginName { kind: PluginKind },

    #[error("plugin '{plugin}' must be initialized with a {expected} context")]
    WrongContextType { plugin: String, expected: PluginKind },

    #[error("a {kind} plugin named '{name}' is already attached")]
    DuplicatePlugin { kind: PluginKind, name: String },

    #[error("no registered playback can play source {url:?}")]
    NoPlayableCandidate { url: Option<String> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Engine errors
    #[error("Engine error: {0}")]
    Engine(String),
}

impl Error {
    /// Create an engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Error::Engine(msg.into())
    }

    /// Returns true for errors caused by a broken composition graph
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Error::Engine(_))
    }

    /// Returns the error code carried in event payloads
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::MissingPluginName { .. } => "MISSING_PLUGIN_NAME",
            Error::WrongContextType { .. } => "WRONG_CONTEXT_TYPE",
            Error::DuplicatePlugin { .. } => "DUPLICATE_PLUGIN",
            Error::NoPlayableCandidate { .. } => "NO_PLAYABLE_CANDIDATE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Engine(_) => "ENGINE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = Error::MissingPluginName { kind: PluginKind::Core };
        assert_eq!(err.error_code(), "MISSING_PLUGIN_NAME");
        assert!(err.is_configuration());

        let err = Error::engine("decoder gone");
        assert_eq!(err.error_code(), "ENGINE");
        assert!(!err.is_configuration());
        assert_eq!(err.to_string(), "Engine error: decoder gone");
    }

    #[test]
    fn test_wrong_context_message() {
        let err = Error::WrongContextType {
            plugin: "spinner".into(),
            expected: PluginKind::Container,
        };
        assert_eq!(
            err.to_string(),
            "plugin 'spinner' must be initialized with a container context"
        );
    }
}
