//! Match threshold shared by a whole batch

use serde::{Deserialize, Serialize};
use std::fmt;

/// Face-match threshold in the backend's 30–100 scale
///
/// Out-of-range input (including NaN and infinities) is silently replaced by
/// [`Threshold::MIN`], mirroring the threshold control of the web client.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    pub const MIN: f64 = 30.0;
    pub const MAX: f64 = 100.0;
    pub const DEFAULT: f64 = 50.0;

    pub fn new(value: f64) -> Self {
        if Self::in_range(value) {
            Self(value)
        } else {
            tracing::debug!(requested = value, clamped = Self::MIN, "Threshold out of range");
            Self(Self::MIN)
        }
    }

    pub fn in_range(value: f64) -> bool {
        (Self::MIN..=Self::MAX).contains(&value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl From<f64> for Threshold {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Threshold> for f64 {
    fn from(threshold: Threshold) -> Self {
        threshold.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
