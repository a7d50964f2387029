//! Error type raised by the notifier itself

use thiserror::Error;

/// Errors produced by the notifier's own machinery.
///
/// Values of this type are never reported to Honeybadger: its type name is always part of
/// the excluded exception prefixes, see [`internal_error_type`].
#[derive(Error, Debug)]
pub enum HoneybadgerError {
    #[error(
        "Honeybadger URL was not correctly formed: {url} ({reason}). \
         Double check the [honeybadger.url] setting and verify that it is a valid URL"
    )]
    InvalidEndpoint { url: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to load configuration: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Error record carries no fault")]
    MissingFault,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HoneybadgerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        HoneybadgerError::Configuration {
            message: message.into(),
        }
    }
}

/// Result type alias for notifier operations
pub type HoneybadgerResult<T> = Result<T, HoneybadgerError>;

/// Fully-qualified type name of [`HoneybadgerError`], as it appears in a [`crate::Fault`]
/// built with [`crate::Fault::from_error`].
pub fn internal_error_type() -> &'static str {
    std::any::type_name::<HoneybadgerError>()
}
