//! CSS timing functions

use std::fmt;
use std::str::FromStr;

/// A CSS easing curve
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Easing {
    Linear,
    #[default]
    Ease,
    EaseIn,
    EaseOut,
    EaseInOut,
    /// `cubic-bezier(x1, y1, x2, y2)`
    CubicBezier(f32, f32, f32, f32),
}

impl Easing {
    /// Material "standard" curve, used for fades
    pub const STANDARD: Easing = Easing::CubicBezier(0.4, 0.0, 0.2, 1.0);
    /// Slight overshoot, used for the settle motion of a card
    pub const OVERSHOOT: Easing = Easing::CubicBezier(0.34, 1.56, 0.64, 1.0);
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => write!(f, "linear"),
            Easing::Ease => write!(f, "ease"),
            Easing::EaseIn => write!(f, "ease-in"),
            Easing::EaseOut => write!(f, "ease-out"),
            Easing::EaseInOut => write!(f, "ease-in-out"),
            Easing::CubicBezier(x1, y1, x2, y2) => {
                write!(f, "cubic-bezier({}, {}, {}, {})", x1, y1, x2, y2)
            }
        }
    }
}

/// Unrecognized timing function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEasingError(pub String);

impl fmt::Display for ParseEasingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid timing function '{}'", self.0)
    }
}

impl std::error::Error for ParseEasingError {}

impl FromStr for Easing {
    type Err = ParseEasingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed {
            "linear" => return Ok(Easing::Linear),
            "ease" => return Ok(Easing::Ease),
            "ease-in" => return Ok(Easing::EaseIn),
            "ease-out" => return Ok(Easing::EaseOut),
            "ease-in-out" => return Ok(Easing::EaseInOut),
            _ => {}
        }

        let err = || ParseEasingError(trimmed.to_string());
        let args = trimmed
            .strip_prefix("cubic-bezier(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(err)?;

        let values = args
            .split(',')
            .map(|v| v.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| err())?;

        match values.as_slice() {
            // x coordinates must stay within [0, 1]
            [x1, y1, x2, y2] if (0.0..=1.0).contains(x1) && (0.0..=1.0).contains(x2) => {
                Ok(Easing::CubicBezier(*x1, *y1, *x2, *y2))
            }
            _ => Err(err()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        assert_eq!("ease-out".parse::<Easing>().unwrap(), Easing::EaseOut);
        assert_eq!(" linear ".parse::<Easing>().unwrap(), Easing::Linear);
    }

    #[test]
    fn test_cubic_bezier() {
        let easing: Easing = "cubic-bezier(0.34, 1.56, 0.64, 1)".parse().unwrap();
        assert_eq!(easing, Easing::OVERSHOOT);
        assert_eq!(easing.to_string(), "cubic-bezier(0.34, 1.56, 0.64, 1)");
    }

    #[test]
    fn test_rejects_invalid() {
        assert!("bounce".parse::<Easing>().is_err());
        assert!("cubic-bezier(0.1, 0.2, 0.3)".parse::<Easing>().is_err());
        assert!("cubic-bezier(1.5, 0, 0.2, 1)".parse::<Easing>().is_err());
    }
}
