//! The user's bite limit and configuration errors.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors raised while validating configuration before a session starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("bite limit must be at least 1")]
    ZeroLimit,

    #[error("fps range is invalid: min {min}, target {target}, max {max}")]
    FpsRange { min: f64, target: f64, max: f64 },

    #[error("headroom must be in (0, 1], got {0}")]
    Headroom(f64),

    #[error("fps adjust window must be at least one frame")]
    EmptyWindow,

    #[error("{0} must be positive")]
    NonPositive(&'static str),
}

/// How many bites are allowed before the alarm sounds. Always at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BiteLimit(NonZeroU32);

impl BiteLimit {
    pub const DEFAULT: u32 = 10;

    /// Limits at or above this are refused by [`BiteLimit::from_user_input`].
    pub const SANITY_CAP: u32 = 100;

    pub fn new(limit: u32) -> Result<Self, ConfigError> {
        NonZeroU32::new(limit).map(BiteLimit).ok_or(ConfigError::ZeroLimit)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Interpret free-form user input.
    ///
    /// Garbage or zero falls back to the default, negatives clamp to 1, and
    /// anything at or over [`Self::SANITY_CAP`] is refused and replaced by
    /// the default.
    pub fn from_user_input(text: &str) -> LimitInput {
        let value = match text.trim().parse::<i64>() {
            Ok(0) | Err(_) => i64::from(Self::DEFAULT),
            Ok(n)          => n.max(1),
        };
        if value >= i64::from(Self::SANITY_CAP) {
            warn!(requested = value, "Don't be a fatty, limit reset to {}", Self::DEFAULT);
            return LimitInput::Refused(Self::default());
        }
        // 1 ..= 99 here
        LimitInput::Accepted(Self::try_from(value as u32).unwrap_or_default())
    }

    /// Step the limit by `delta`, staying within `1 .. SANITY_CAP`.
    pub fn saturating_add(self, delta: i32) -> Self {
        let next = (self.get() as i64 + delta as i64).clamp(1, i64::from(Self::SANITY_CAP) - 1);
        Self::try_from(next as u32).unwrap_or(self)
    }
}

/// What [`BiteLimit::from_user_input`] made of the text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitInput {
    Accepted(BiteLimit),
    /// Over the sanity cap; carries the default that replaced it.
    Refused(BiteLimit),
}

impl LimitInput {
    pub fn limit(self) -> BiteLimit {
        match self {
            LimitInput::Accepted(l) | LimitInput::Refused(l) => l,
        }
    }

    pub fn is_refused(self) -> bool {
        matches!(self, LimitInput::Refused(_))
    }
}

impl Default for BiteLimit {
    fn default() -> Self {
        BiteLimit(NonZeroU32::MIN.saturating_add(Self::DEFAULT - 1))
    }
}

impl TryFrom<u32> for BiteLimit {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        BiteLimit::new(value)
    }
}

impl From<BiteLimit> for u32 {
    fn from(limit: BiteLimit) -> u32 {
        limit.get()
    }
}

impl fmt::Display for BiteLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert_eq!(BiteLimit::new(0), Err(ConfigError::ZeroLimit));
        assert_eq!(BiteLimit::new(1).map(BiteLimit::get), Ok(1));
    }

    #[test]
    fn default_is_ten() {
        assert_eq!(BiteLimit::default().get(), 10);
    }

    #[test]
    fn user_input_parses_and_clamps() {
        let typed = |t: &str| BiteLimit::from_user_input(t).limit().get();
        assert_eq!(typed("25"), 25);
        assert_eq!(typed("  3 "), 3);
        assert_eq!(typed("-4"), 1);
        assert_eq!(typed("0"), 10);
        assert_eq!(typed("lots"), 10);
    }

    #[test]
    fn garbage_falls_back_without_refusal() {
        assert_eq!(BiteLimit::from_user_input("lots"), LimitInput::Accepted(BiteLimit::default()));
        assert!(!BiteLimit::from_user_input("-4").is_refused());
    }

    #[test]
    fn user_input_refuses_huge_limits() {
        let ninety_nine = BiteLimit::new(99).unwrap();
        assert_eq!(BiteLimit::from_user_input("99"), LimitInput::Accepted(ninety_nine));
        assert_eq!(BiteLimit::from_user_input("100"), LimitInput::Refused(BiteLimit::default()));
        assert!(BiteLimit::from_user_input(" 5000 ").is_refused());
        assert_eq!(BiteLimit::from_user_input("5000").limit().get(), 10);
    }

    #[test]
    fn stepping_stays_in_range() {
        let one = BiteLimit::new(1).unwrap();
        assert_eq!(one.saturating_add(-5).get(), 1);
        assert_eq!(one.saturating_add(4).get(), 5);
        assert_eq!(BiteLimit::new(98).unwrap().saturating_add(10).get(), 99);
    }

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        limit: BiteLimit,
    }

    fn wrapper_from(n: u32) -> Result<Wrapper, serde::de::value::Error> {
        use serde::de::value::MapDeserializer;
        Wrapper::deserialize(MapDeserializer::new(std::iter::once(("limit", n))))
    }

    #[test]
    fn deserialize_rejects_zero() {
        assert_eq!(wrapper_from(7).map(|w| w.limit.get()).ok(), Some(7));
        assert!(wrapper_from(0).is_err());
    }
}
