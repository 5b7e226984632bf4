use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MeteorError, Result};

/// Meteor detection sensitivity, 1 (strictest) to 5 (most permissive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SensitivityLevel(u8);

/// Acceptance thresholds of one sensitivity level.
///
/// Lengths are in full-resolution pixels and scaled to the analysis raster by
/// the scorer. Brightness is on the [0, 1] intensity scale, curvature is an
/// RMS deviation in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub min_length: f32,
    pub min_score: f32,
    pub max_curvature: f32,
    pub min_brightness: f32,
}

const TABLE: [Thresholds; 5] = [
    Thresholds {
        min_length: 100.0,
        min_score: 0.70,
        max_curvature: 1.0,
        min_brightness: 180.0 / 255.0,
    },
    Thresholds {
        min_length: 80.0,
        min_score: 0.60,
        max_curvature: 1.5,
        min_brightness: 150.0 / 255.0,
    },
    Thresholds {
        min_length: 50.0,
        min_score: 0.50,
        max_curvature: 2.0,
        min_brightness: 120.0 / 255.0,
    },
    Thresholds {
        min_length: 30.0,
        min_score: 0.40,
        max_curvature: 2.5,
        min_brightness: 100.0 / 255.0,
    },
    Thresholds {
        min_length: 20.0,
        min_score: 0.30,
        max_curvature: 3.0,
        min_brightness: 80.0 / 255.0,
    },
];

impl SensitivityLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(level: u8) -> Result<Self> {
        Self::try_from(level)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// All levels, strictest first.
    pub fn all() -> impl Iterator<Item = SensitivityLevel> {
        (Self::MIN..=Self::MAX).map(SensitivityLevel)
    }

    pub fn thresholds(self) -> Thresholds {
        TABLE[(self.0 - Self::MIN) as usize]
    }

    pub fn description(self) -> &'static str {
        match self.0 {
            1 => "Very strict (fewer candidates, might miss faint meteors)",
            2 => "Strict",
            3 => "Balanced (recommended)",
            4 => "Sensitive",
            _ => "Very sensitive (more candidates, catches faint trails)",
        }
    }
}

impl Default for SensitivityLevel {
    fn default() -> Self {
        SensitivityLevel(3)
    }
}

impl TryFrom<u8> for SensitivityLevel {
    type Error = MeteorError;

    fn try_from(level: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(SensitivityLevel(level))
        } else {
            Err(MeteorError::Configuration(format!(
                "sensitivity must be between {} and {}, got {level}",
                Self::MIN,
                Self::MAX
            )))
        }
    }
}

impl From<SensitivityLevel> for u8 {
    fn from(level: SensitivityLevel) -> u8 {
        level.0
    }
}

impl fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
