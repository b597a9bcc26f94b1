use axum::Json;
use axum::extract::{Path, State};
use common::permission;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::course::CourseResponse;
use crate::models::registration::EnrolledStudentResponse;
use crate::models::result::{
    ReleaseResponse, ResultResponse, SubmitGradeRequest, normalize_remarks, validate_submit_grade,
};
use crate::services::{EnrollmentService, GradeSubmission, GradingService};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/grading/courses",
    tag = "Grading",
    operation_id = "listGradableCourses",
    summary = "Courses ready for grading",
    description = "Active courses with at least one registered student. Requires `grade:submit` permission.",
    responses(
        (status = 200, description = "Gradable courses", body = Vec<CourseResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(lecturer_id = auth_user.user_id))]
pub async fn gradable_courses(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, AppError> {
    auth_user.require_permission(permission::GRADE_SUBMIT)?;

    let courses = GradingService::new(&state.db).gradable_courses().await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/grading/courses/{id}/students",
    tag = "Grading",
    operation_id = "listEnrolledStudents",
    summary = "Students holding a seat in a course",
    description = "Each entry tells whether a result has been recorded and includes it if so. Requires `grade:submit` permission.",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Enrolled students", body = Vec<EnrolledStudentResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(course_id))]
pub async fn enrolled_students(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<i32>,
) -> Result<Json<Vec<EnrolledStudentResponse>>, AppError> {
    auth_user.require_permission(permission::GRADE_SUBMIT)?;

    let students = EnrollmentService::new(&state.db)
        .list_enrolled_students(course_id)
        .await?;
    Ok(Json(students.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/grading/courses/{id}/grades",
    tag = "Grading",
    operation_id = "submitGrade",
    summary = "Record a student's marks",
    description = "Derives the letter grade from the marks and stores the single result for this student and course, overwriting any earlier one. A regrade hides the result again until it is re-released. Requires `grade:submit` permission.",
    params(("id" = i32, Path, description = "Course ID")),
    request_body = SubmitGradeRequest,
    responses(
        (status = 200, description = "Result recorded", body = ResultResponse),
        (status = 400, description = "Marks out of range (INVALID_INPUT) or validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
        (status = 422, description = "Student not enrolled (INVALID_STATE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(course_id, student_id = payload.student_id, lecturer_id = auth_user.user_id))]
pub async fn submit_grade(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<i32>,
    AppJson(payload): AppJson<SubmitGradeRequest>,
) -> Result<Json<ResultResponse>, AppError> {
    auth_user.require_permission(permission::GRADE_SUBMIT)?;
    validate_submit_grade(&payload)?;

    let result = GradingService::new(&state.db)
        .submit_grade(
            auth_user.user_id,
            GradeSubmission {
                student_id: payload.student_id,
                course_id,
                marks: payload.marks,
                remarks: normalize_remarks(payload.remarks.as_deref()).map(str::to_string),
            },
        )
        .await?;
    Ok(Json(result.into()))
}

#[utoipa::path(
    get,
    path = "/grading/courses/{id}/results",
    tag = "Grading",
    operation_id = "listCourseResults",
    summary = "Results I recorded for a course",
    description = "All results the caller recorded for the course, released or not. Requires `grade:submit` permission.",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Results", body = Vec<ResultResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(course_id, lecturer_id = auth_user.user_id))]
pub async fn course_results(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<i32>,
) -> Result<Json<Vec<ResultResponse>>, AppError> {
    auth_user.require_permission(permission::GRADE_SUBMIT)?;

    let results = GradingService::new(&state.db)
        .course_results(auth_user.user_id, course_id)
        .await?;
    Ok(Json(results.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/grading/courses/{id}/release",
    tag = "Grading",
    operation_id = "releaseResults",
    summary = "Release results to students",
    description = "Makes every unreleased result the caller recorded for the course visible to its student. Already released results are untouched, so repeating the call releases nothing. Requires `grade:submit` permission.",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Number of results released", body = ReleaseResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(course_id, lecturer_id = auth_user.user_id))]
pub async fn release_results(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<i32>,
) -> Result<Json<ReleaseResponse>, AppError> {
    auth_user.require_permission(permission::GRADE_SUBMIT)?;

    let released = GradingService::new(&state.db)
        .release_results(auth_user.user_id, course_id)
        .await?;
    Ok(Json(ReleaseResponse { released }))
}
