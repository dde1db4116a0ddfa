//! Error types for glide
//!
//! Animation paths never fail: a missed animation is cosmetic. The only
//! fallible surface is loading and validating configuration.

use thiserror::Error;

/// Errors that can occur while configuring the engine
#[derive(Error, Debug)]
pub enum GlideError {
    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration document could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration could not be serialized
    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Reading a configuration file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GlideError {
    /// Shorthand for [`GlideError::InvalidConfig`]
    pub fn invalid(message: impl Into<String>) -> Self {
        GlideError::InvalidConfig(message.into())
    }
}

/// Result type for glide operations
pub type Result<T> = std::result::Result<T, GlideError>;
