//! Event types delivered to element listeners

use std::fmt;

/// Kinds of events an element can receive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    PointerEnter,
    PointerLeave,
    TouchStart,
    Click,
    KeyDown,
    /// Document structure parsed
    DomContentLoaded,
    /// Document and sub-resources loaded
    Load,
}

impl EventType {
    /// DOM event name
    pub fn name(&self) -> &'static str {
        match self {
            EventType::PointerEnter => "mouseenter",
            EventType::PointerLeave => "mouseleave",
            EventType::TouchStart => "touchstart",
            EventType::Click => "click",
            EventType::KeyDown => "keydown",
            EventType::DomContentLoaded => "DOMContentLoaded",
            EventType::Load => "load",
        }
    }

    /// Whether the event propagates from the target to its ancestors
    pub fn bubbles(&self) -> bool {
        matches!(
            self,
            EventType::TouchStart | EventType::Click | EventType::KeyDown
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keys relevant to card activation
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Space,
    Tab,
    Escape,
    /// Any other key, by its key value
    Other(String),
}

impl Key {
    /// Whether the key activates a focused link the way a click would
    pub fn is_activation(&self) -> bool {
        matches!(self, Key::Enter | Key::Space)
    }
}
