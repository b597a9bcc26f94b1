#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a student's registration in a course.
///
/// A dropped registration is never reactivated; registering again creates a new record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    /// Holds a seat in the course.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Active"))]
    Active,
    /// Released its seat.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Dropped"))]
    Dropped,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Dropped => "DROPPED",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for RegistrationStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid registration status '{0}'. Valid values: ACTIVE, DROPPED")]
pub struct ParseStatusError(String);

impl FromStr for RegistrationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "DROPPED" => Ok(Self::Dropped),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}
