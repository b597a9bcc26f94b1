#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod permission {
    pub const COURSE_MANAGE: &str = "course:manage";
    pub const COURSE_VIEW: &str = "course:view";
    pub const REGISTRATION_SELF: &str = "registration:self";
    pub const REGISTRATION_VIEW_ALL: &str = "registration:view_all";
    pub const GRADE_SUBMIT: &str = "grade:submit";
    pub const RESULT_VIEW_OWN: &str = "result:view_own";
    pub const RESULT_VIEW_ALL: &str = "result:view_all";
    pub const USER_MANAGE: &str = "user:manage";
}

use permission::*;

/// Role tag carried by every identity record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "admin"))]
    Admin,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "lecturer"))]
    Lecturer,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "student"))]
    Student,
}

impl Role {
    pub const ALL: &'static [Role] = &[Self::Admin, Self::Lecturer, Self::Student];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Lecturer => "lecturer",
            Self::Student => "student",
        }
    }

    /// Permissions granted to this role.
    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            Self::Admin => &[
                COURSE_MANAGE,
                COURSE_VIEW,
                REGISTRATION_VIEW_ALL,
                RESULT_VIEW_ALL,
                USER_MANAGE,
            ],
            Self::Lecturer => &[
                COURSE_VIEW,
                REGISTRATION_VIEW_ALL,
                GRADE_SUBMIT,
                RESULT_VIEW_ALL,
            ],
            Self::Student => &[COURSE_VIEW, REGISTRATION_SELF, RESULT_VIEW_OWN],
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions().contains(&permission)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid role '{0}'. Valid values: admin, lecturer, student")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "lecturer" => Ok(Self::Lecturer),
            "student" => Ok(Self::Student),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

/// Role-specific attributes of an identity, one variant per role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Identity {
    Admin,
    Lecturer {
        staff_number: String,
        department: Option<String>,
    },
    Student {
        student_number: String,
        program: Option<String>,
        year: Option<i32>,
    },
}

impl Identity {
    pub fn role(&self) -> Role {
        match self {
            Self::Admin => Role::Admin,
            Self::Lecturer { .. } => Role::Lecturer,
            Self::Student { .. } => Role::Student,
        }
    }

    pub fn student_number(&self) -> Option<&str> {
        match self {
            Self::Student { student_number, .. } => Some(student_number),
            _ => None,
        }
    }
}
