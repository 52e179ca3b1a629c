//! Core error types

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        /// File that was requested
        path: PathBuf,
        /// Underlying read failure
        #[source]
        source: std::io::Error,
    },

    /// The TOML source could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value outside its accepted range
    #[error("Invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Result type for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;
