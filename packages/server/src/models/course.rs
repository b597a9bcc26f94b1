use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{
    double_option, validate_course_code, validate_prerequisite_codes, validate_text,
};
use crate::entity::course;
use crate::error::AppError;
use crate::services::{CourseChanges, NewCourse};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCourseRequest {
    /// Unique course code, stored uppercase.
    #[schema(example = "CS101")]
    pub code: String,
    #[schema(example = "Introduction to Programming")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = 3)]
    pub credits: i32,
    #[schema(example = "Computer Science")]
    pub department: String,
    /// Seat limit. Omit or `null` for unlimited.
    #[schema(example = 40)]
    pub max_enrollments: Option<i32>,
    /// Defaults to `true`.
    pub active: Option<bool>,
    /// Codes of courses that must be taken first.
    #[serde(default)]
    #[schema(example = json!(["MATH100"]))]
    pub prerequisites: Vec<String>,
}

pub fn validate_create_course(payload: &CreateCourseRequest) -> Result<(), AppError> {
    validate_course_code(&payload.code)?;
    validate_text(&payload.title, "Title", 256)?;
    validate_text(&payload.department, "Department", 128)?;
    validate_credits(payload.credits)?;
    validate_capacity(payload.max_enrollments)?;
    validate_prerequisite_codes(&payload.prerequisites)
}

impl From<CreateCourseRequest> for NewCourse {
    fn from(payload: CreateCourseRequest) -> Self {
        Self {
            code: payload.code,
            title: payload.title.trim().to_string(),
            description: payload.description,
            credits: payload.credits,
            department: payload.department.trim().to_string(),
            max_enrollments: payload.max_enrollments,
            active: payload.active.unwrap_or(true),
            prerequisite_codes: payload.prerequisites,
        }
    }
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub credits: Option<i32>,
    pub department: Option<String>,
    /// `null` removes the seat limit; absent leaves it unchanged.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub max_enrollments: Option<Option<i32>>,
    pub active: Option<bool>,
    /// When present, replaces the prerequisite set.
    pub prerequisites: Option<Vec<String>>,
}

pub fn validate_update_course(payload: &UpdateCourseRequest) -> Result<(), AppError> {
    if let Some(ref title) = payload.title {
        validate_text(title, "Title", 256)?;
    }
    if let Some(ref department) = payload.department {
        validate_text(department, "Department", 128)?;
    }
    if let Some(credits) = payload.credits {
        validate_credits(credits)?;
    }
    if let Some(max) = payload.max_enrollments {
        validate_capacity(max)?;
    }
    if let Some(ref codes) = payload.prerequisites {
        validate_prerequisite_codes(codes)?;
    }
    Ok(())
}

impl From<UpdateCourseRequest> for CourseChanges {
    fn from(payload: UpdateCourseRequest) -> Self {
        Self {
            title: payload.title.map(|t| t.trim().to_string()),
            description: payload.description,
            credits: payload.credits,
            department: payload.department.map(|d| d.trim().to_string()),
            max_enrollments: payload.max_enrollments,
            active: payload.active,
            prerequisite_codes: payload.prerequisites,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SetPrerequisitesRequest {
    /// Complete new prerequisite set. An empty list clears it.
    #[schema(example = json!(["CS101", "MATH100"]))]
    pub prerequisites: Vec<String>,
}

fn validate_credits(credits: i32) -> Result<(), AppError> {
    if !(0..=30).contains(&credits) {
        return Err(AppError::Validation("Credits must be 0-30".into()));
    }
    Ok(())
}

fn validate_capacity(max_enrollments: Option<i32>) -> Result<(), AppError> {
    if let Some(max) = max_enrollments
        && max < 1
    {
        return Err(AppError::Validation(
            "max_enrollments must be at least 1".into(),
        ));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CourseResponse {
    pub id: i32,
    #[schema(example = "CS101")]
    pub code: String,
    pub title: String,
    pub description: String,
    pub credits: i32,
    pub department: String,
    pub max_enrollments: Option<i32>,
    pub current_enrollments: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<course::Model> for CourseResponse {
    fn from(c: course::Model) -> Self {
        Self {
            id: c.id,
            code: c.code,
            title: c.title,
            description: c.description,
            credits: c.credits,
            department: c.department,
            max_enrollments: c.max_enrollments,
            current_enrollments: c.current_enrollments,
            active: c.active,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Compact course reference used in prerequisite and dependent lists.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CourseSummary {
    pub id: i32,
    #[schema(example = "CS101")]
    pub code: String,
    pub title: String,
    pub credits: i32,
}

impl From<course::Model> for CourseSummary {
    fn from(c: course::Model) -> Self {
        Self {
            id: c.id,
            code: c.code,
            title: c.title,
            credits: c.credits,
        }
    }
}

/// A course as listed to students.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CatalogEntry {
    pub id: i32,
    #[schema(example = "CS101")]
    pub code: String,
    pub title: String,
    pub description: String,
    pub credits: i32,
    pub department: String,
    pub max_enrollments: Option<i32>,
    pub current_enrollments: i32,
    /// Whether a seat is still free.
    pub available: bool,
}

impl From<course::Model> for CatalogEntry {
    fn from(c: course::Model) -> Self {
        Self {
            available: c.has_free_seat(),
            id: c.id,
            code: c.code,
            title: c.title,
            description: c.description,
            credits: c.credits,
            department: c.department,
            max_enrollments: c.max_enrollments,
            current_enrollments: c.current_enrollments,
        }
    }
}
