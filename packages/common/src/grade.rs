#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest accepted mark.
pub const MIN_MARKS: f64 = 0.0;
/// Highest accepted mark.
pub const MAX_MARKS: f64 = 100.0;

/// Letter grade derived from numeric marks.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(2))")
)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "A+"))]
    APlus,
    #[serde(rename = "A")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "A"))]
    A,
    #[serde(rename = "A-")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "A-"))]
    AMinus,
    #[serde(rename = "B+")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "B+"))]
    BPlus,
    #[serde(rename = "B")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "B"))]
    B,
    #[serde(rename = "B-")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "B-"))]
    BMinus,
    #[serde(rename = "C+")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "C+"))]
    CPlus,
    #[serde(rename = "C")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "C"))]
    C,
    #[serde(rename = "C-")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "C-"))]
    CMinus,
    #[serde(rename = "D")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "D"))]
    D,
    #[serde(rename = "F")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "F"))]
    F,
}

/// Inclusive lower bound of each band, highest band first.
/// A mark belongs to the first band whose lower bound it reaches.
const BANDS: &[(f64, LetterGrade)] = &[
    (85.0, LetterGrade::APlus),
    (80.0, LetterGrade::A),
    (75.0, LetterGrade::AMinus),
    (70.0, LetterGrade::BPlus),
    (65.0, LetterGrade::B),
    (60.0, LetterGrade::BMinus),
    (55.0, LetterGrade::CPlus),
    (50.0, LetterGrade::C),
    (45.0, LetterGrade::CMinus),
    (40.0, LetterGrade::D),
    (0.0, LetterGrade::F),
];

/// Marks outside `[0, 100]` (or not a finite number).
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("Marks must be between 0 and 100, got {0}")]
pub struct MarksOutOfRange(pub f64);

impl LetterGrade {
    /// Derive the letter grade for `marks` using the fixed banding table.
    pub fn from_marks(marks: f64) -> Result<Self, MarksOutOfRange> {
        if !marks.is_finite() || !(MIN_MARKS..=MAX_MARKS).contains(&marks) {
            return Err(MarksOutOfRange(marks));
        }
        Ok(BANDS
            .iter()
            .find(|(lower, _)| marks >= *lower)
            .map(|(_, grade)| *grade)
            .unwrap_or(LetterGrade::F))
    }

    /// All grades, best first.
    pub const ALL: &'static [LetterGrade] = &[
        Self::APlus,
        Self::A,
        Self::AMinus,
        Self::BPlus,
        Self::B,
        Self::BMinus,
        Self::CPlus,
        Self::C,
        Self::CMinus,
        Self::D,
        Self::F,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::AMinus => "A-",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::CMinus => "C-",
            Self::D => "D",
            Self::F => "F",
        }
    }

    /// Returns true for every grade except `F`.
    pub fn is_pass(&self) -> bool {
        !matches!(self, Self::F)
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid grade string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid grade '{0}'")]
pub struct ParseGradeError(String);

impl FromStr for LetterGrade {
    type Err = ParseGradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|g| g.as_str() == s)
            .copied()
            .ok_or_else(|| ParseGradeError(s.to_string()))
    }
}
