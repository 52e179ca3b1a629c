//! CSS `transition` value builder
//!
//! ```ignore
//! let spec = TransitionSpec::new()
//!     .with("opacity", 600, Easing::STANDARD, 160)
//!     .with("transform", 600, Easing::OVERSHOOT, 160);
//! element.set_style("transition", spec.to_string());
//! ```

use smallvec::SmallVec;
use std::fmt;

use crate::easing::Easing;

/// One property entry of a transition
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionProperty {
    pub property: String,
    pub duration_ms: u32,
    pub easing: Easing,
    pub delay_ms: u32,
}

impl fmt::Display for TransitionProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}ms {} {}ms",
            self.property, self.duration_ms, self.easing, self.delay_ms
        )
    }
}

/// A full `transition` declaration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransitionSpec {
    properties: SmallVec<[TransitionProperty; 2]>,
}

impl TransitionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property transition
    pub fn with(
        mut self,
        property: impl Into<String>,
        duration_ms: u32,
        easing: Easing,
        delay_ms: u32,
    ) -> Self {
        self.properties.push(TransitionProperty {
            property: property.into(),
            duration_ms,
            easing,
            delay_ms,
        });
        self
    }

    pub fn properties(&self) -> &[TransitionProperty] {
        &self.properties
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl fmt::Display for TransitionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.properties.is_empty() {
            return write!(f, "none");
        }
        for (i, prop) in self.properties.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", prop)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_property_transition() {
        let spec = TransitionSpec::new()
            .with("opacity", 640, Easing::EaseOut, 160)
            .with("transform", 640, Easing::Linear, 160);

        assert_eq!(
            spec.to_string(),
            "opacity 640ms ease-out 160ms, transform 640ms linear 160ms"
        );
        assert_eq!(spec.properties().len(), 2);
    }

    #[test]
    fn test_empty_is_none() {
        assert_eq!(TransitionSpec::new().to_string(), "none");
    }
}
