//! Document error types

use thiserror::Error;

use crate::document::ElementId;

/// Errors raised by the raw document API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    /// Selector text could not be parsed
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// The element was never created or has been removed
    #[error("Unknown element {0:?}")]
    UnknownElement(ElementId),
}

/// Result type for document operations
pub type Result<T> = std::result::Result<T, DomError>;
