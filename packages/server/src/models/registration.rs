use chrono::{DateTime, Utc};
use common::RegistrationStatus;
use serde::Serialize;

use super::result::ResultResponse;
use crate::entity::registration;
use crate::services::EnrolledStudent;

#[derive(Serialize, utoipa::ToSchema)]
pub struct RegistrationResponse {
    pub id: i32,
    pub student_id: i32,
    #[schema(example = "SC2021001")]
    pub student_number: String,
    pub course_id: i32,
    #[schema(example = "CS101")]
    pub course_code: String,
    pub course_title: String,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
    pub dropped_at: Option<DateTime<Utc>>,
}

impl From<registration::Model> for RegistrationResponse {
    fn from(r: registration::Model) -> Self {
        Self {
            id: r.id,
            student_id: r.student_id,
            student_number: r.student_number,
            course_id: r.course_id,
            course_code: r.course_code,
            course_title: r.course_title,
            status: r.status,
            registered_at: r.registered_at,
            dropped_at: r.dropped_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RegistrationCheckResponse {
    pub course_id: i32,
    pub registered: bool,
}

/// One seat holder, as listed to the grading lecturer.
#[derive(Serialize, utoipa::ToSchema)]
pub struct EnrolledStudentResponse {
    pub registration_id: i32,
    pub student_id: i32,
    #[schema(example = "SC2021001")]
    pub student_number: String,
    #[schema(example = "Jane Doe")]
    pub full_name: Option<String>,
    pub program: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub has_result: bool,
    pub result: Option<ResultResponse>,
}

impl From<EnrolledStudent> for EnrolledStudentResponse {
    fn from(e: EnrolledStudent) -> Self {
        Self {
            registration_id: e.registration.id,
            student_id: e.registration.student_id,
            student_number: e.registration.student_number,
            full_name: e.student.as_ref().map(|s| s.full_name()),
            program: e.student.and_then(|s| s.program),
            registered_at: e.registration.registered_at,
            has_result: e.result.is_some(),
            result: e.result.map(ResultResponse::from),
        }
    }
}
