//! Responsive breakpoints.
//!
//! Geometry is stored independently per breakpoint. The enumeration is ordered
//! from the smallest to the largest viewport class, so `Ord` and [`Breakpoint::index`]
//! can be used to scale templates monotonically.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A named viewport-size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Breakpoint {
    #[serde(rename = "xs")]
    Xs,
    #[serde(rename = "sm")]
    Sm,
    #[serde(rename = "md")]
    Md,
    #[serde(rename = "lg")]
    Lg,
    #[serde(rename = "xl")]
    Xl,
    #[serde(rename = "2xl")]
    Xxl,
    #[serde(rename = "3xl")]
    Xxxl,
    #[serde(rename = "4xl")]
    Xxxxl,
}

/// Error returned when a breakpoint name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown breakpoint: {0}")]
pub struct UnknownBreakpoint(pub String);

impl Breakpoint {
    /// Every breakpoint, smallest first.
    pub const ALL: [Breakpoint; 8] = [
        Breakpoint::Xs,
        Breakpoint::Sm,
        Breakpoint::Md,
        Breakpoint::Lg,
        Breakpoint::Xl,
        Breakpoint::Xxl,
        Breakpoint::Xxxl,
        Breakpoint::Xxxxl,
    ];

    /// Breakpoint whose entry is used when the active one has none.
    pub const BASE: Breakpoint = Breakpoint::Lg;

    /// Position in [`Breakpoint::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Internal name, also used as the key in serialized config sets.
    pub fn as_str(self) -> &'static str {
        match self {
            Breakpoint::Xs => "xs",
            Breakpoint::Sm => "sm",
            Breakpoint::Md => "md",
            Breakpoint::Lg => "lg",
            Breakpoint::Xl => "xl",
            Breakpoint::Xxl => "2xl",
            Breakpoint::Xxxl => "3xl",
            Breakpoint::Xxxxl => "4xl",
        }
    }

    /// Name used by the remote store schema, which cannot start a value with a digit.
    pub fn remote_alias(self) -> &'static str {
        match self {
            Breakpoint::Xxl => "xxl",
            Breakpoint::Xxxl => "xxxl",
            Breakpoint::Xxxxl => "xxxxl",
            other => other.as_str(),
        }
    }

    /// Inverse of [`Breakpoint::remote_alias`].
    pub fn from_remote_alias(name: &str) -> Option<Self> {
        match name {
            "xxl" => Some(Breakpoint::Xxl),
            "xxxl" => Some(Breakpoint::Xxxl),
            "xxxxl" => Some(Breakpoint::Xxxxl),
            "2xl" | "3xl" | "4xl" => None,
            other => other.parse().ok(),
        }
    }

    /// Smallest viewport width (in CSS pixels) that selects this breakpoint.
    pub fn min_width(self) -> f64 {
        match self {
            Breakpoint::Xs => 0.0,
            Breakpoint::Sm => 375.0,
            Breakpoint::Md => 425.0,
            Breakpoint::Lg => 768.0,
            Breakpoint::Xl => 1024.0,
            Breakpoint::Xxl => 1280.0,
            Breakpoint::Xxxl => 1440.0,
            Breakpoint::Xxxxl => 1920.0,
        }
    }

    /// Breakpoint active for a viewport of the given width.
    pub fn from_viewport_width(width: f64) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|bp| width >= bp.min_width())
            .unwrap_or(Breakpoint::Xs)
    }
}

impl Default for Breakpoint {
    fn default() -> Self {
        Self::BASE
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Breakpoint {
    type Err = UnknownBreakpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|bp| bp.as_str() == s)
            .ok_or_else(|| UnknownBreakpoint(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_alias_round_trips_every_breakpoint() {
        for bp in Breakpoint::ALL {
            assert_eq!(Breakpoint::from_remote_alias(bp.remote_alias()), Some(bp));
        }
    }

    #[test]
    fn test_remote_alias_names() {
        assert_eq!(Breakpoint::Xxl.remote_alias(), "xxl");
        assert_eq!(Breakpoint::Xxxl.remote_alias(), "xxxl");
        assert_eq!(Breakpoint::Xxxxl.remote_alias(), "xxxxl");
        assert_eq!(Breakpoint::Md.remote_alias(), "md");
        // Internal digit names are not valid on the remote side.
        assert_eq!(Breakpoint::from_remote_alias("2xl"), None);
    }

    #[test]
    fn test_from_viewport_width() {
        assert_eq!(Breakpoint::from_viewport_width(320.0), Breakpoint::Xs);
        assert_eq!(Breakpoint::from_viewport_width(375.0), Breakpoint::Sm);
        assert_eq!(Breakpoint::from_viewport_width(800.0), Breakpoint::Lg);
        assert_eq!(Breakpoint::from_viewport_width(1280.0), Breakpoint::Xxl);
        assert_eq!(Breakpoint::from_viewport_width(2560.0), Breakpoint::Xxxxl);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("3xl".parse::<Breakpoint>(), Ok(Breakpoint::Xxxl));
        assert_eq!(Breakpoint::Xxxl.to_string(), "3xl");
        assert!("huge".parse::<Breakpoint>().is_err());
    }

    #[test]
    fn test_ordering_matches_index() {
        for pair in Breakpoint::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].index() + 1, pair[1].index());
        }
    }
}
