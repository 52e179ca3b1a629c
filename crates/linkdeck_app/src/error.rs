//! Error types for linkdeck_app

use std::path::PathBuf;
use thiserror::Error;

use linkdeck_core::ConfigError;
use linkdeck_dom::DomError;

/// Errors raised while setting up a page
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid deck configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The page manifest is not valid TOML for the manifest schema
    #[error("Failed to parse page manifest: {0}")]
    ManifestParse(#[from] toml::de::Error),

    /// The page manifest parsed but describes an unusable page
    #[error("Invalid page manifest: {0}")]
    InvalidManifest(String),

    /// Reading a file failed
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document operation failed while building the page
    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}

/// Result type for linkdeck_app operations
pub type Result<T> = std::result::Result<T, AppError>;
