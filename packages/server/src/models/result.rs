use chrono::{DateTime, Utc};
use common::LetterGrade;
use serde::{Deserialize, Serialize};

use super::shared::validate_text;
use crate::entity::course_result;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitGradeRequest {
    pub student_id: i32,
    /// Numeric marks in `[0, 100]`.
    #[schema(example = 82.5)]
    pub marks: f64,
    #[schema(example = "Strong final project")]
    pub remarks: Option<String>,
}

const MAX_REMARKS: usize = 2000;

/// Marks are range-checked by the grading service itself. Blank remarks are
/// allowed and stored as absent.
pub fn validate_submit_grade(payload: &SubmitGradeRequest) -> Result<(), AppError> {
    if let Some(remarks) = normalize_remarks(payload.remarks.as_deref()) {
        validate_text(remarks, "Remarks", MAX_REMARKS)?;
    }
    Ok(())
}

/// Trimmed remarks, or `None` when absent or blank.
pub fn normalize_remarks(remarks: Option<&str>) -> Option<&str> {
    remarks.map(str::trim).filter(|r| !r.is_empty())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ResultResponse {
    pub id: i32,
    pub student_id: i32,
    #[schema(example = "SC2021001")]
    pub student_number: String,
    pub course_id: i32,
    #[schema(example = "CS101")]
    pub course_code: String,
    pub course_title: String,
    pub lecturer_id: i32,
    #[schema(example = 82.5)]
    pub marks: f64,
    pub grade: LetterGrade,
    pub passed: bool,
    pub remarks: Option<String>,
    pub graded_at: DateTime<Utc>,
    pub released: bool,
    pub released_at: Option<DateTime<Utc>>,
}

impl From<course_result::Model> for ResultResponse {
    fn from(r: course_result::Model) -> Self {
        Self {
            id: r.id,
            student_id: r.student_id,
            student_number: r.student_number,
            course_id: r.course_id,
            course_code: r.course_code,
            course_title: r.course_title,
            lecturer_id: r.lecturer_id,
            marks: r.marks,
            passed: r.grade.is_pass(),
            grade: r.grade,
            remarks: r.remarks,
            graded_at: r.graded_at,
            released: r.released,
            released_at: r.released_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ReleaseResponse {
    /// Number of results released by this call.
    #[schema(example = 12)]
    pub released: u64,
}
