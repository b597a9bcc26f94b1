use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::permission;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::registration::{RegistrationCheckResponse, RegistrationResponse};
use crate::services::EnrollmentService;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/courses/{id}/registration",
    tag = "Registrations",
    operation_id = "registerForCourse",
    summary = "Register for a course",
    description = "Takes a seat in an active course. Rejected when the course is full, inactive, or the caller already holds a seat. Requires `registration:self` permission.",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 201, description = "Registered", body = RegistrationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already registered (CONFLICT) or course full (CAPACITY_EXCEEDED)", body = ErrorBody),
        (status = 422, description = "Course inactive (INVALID_STATE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(course_id, student_id = auth_user.user_id))]
pub async fn register(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(permission::REGISTRATION_SELF)?;

    let registration = EnrollmentService::new(&state.db)
        .register(auth_user.user_id, course_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse::from(registration)),
    ))
}

#[utoipa::path(
    delete,
    path = "/courses/{id}/registration",
    tag = "Registrations",
    operation_id = "unregisterFromCourse",
    summary = "Drop a course",
    description = "Drops the caller's active registration and frees the seat. Requires `registration:self` permission.",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Dropped"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course or active registration not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(course_id, student_id = auth_user.user_id))]
pub async fn unregister(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(permission::REGISTRATION_SELF)?;

    EnrollmentService::new(&state.db)
        .unregister(auth_user.user_id, course_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/courses/{id}/registration",
    tag = "Registrations",
    operation_id = "checkRegistration",
    summary = "Check whether the caller is registered",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Registration state", body = RegistrationCheckResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(course_id, student_id = auth_user.user_id))]
pub async fn check_registration(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<i32>,
) -> Result<Json<RegistrationCheckResponse>, AppError> {
    auth_user.require_permission(permission::REGISTRATION_SELF)?;

    let registered = EnrollmentService::new(&state.db)
        .is_registered(auth_user.user_id, course_id)
        .await?;

    Ok(Json(RegistrationCheckResponse {
        course_id,
        registered,
    }))
}

#[utoipa::path(
    get,
    path = "/me/registrations",
    tag = "Registrations",
    operation_id = "listMyRegistrations",
    summary = "List my active registrations",
    description = "Active registrations of the caller, oldest first. Requires `registration:self` permission.",
    responses(
        (status = 200, description = "Active registrations", body = Vec<RegistrationResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(student_id = auth_user.user_id))]
pub async fn my_registrations(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<RegistrationResponse>>, AppError> {
    auth_user.require_permission(permission::REGISTRATION_SELF)?;

    let registrations = EnrollmentService::new(&state.db)
        .list_active_by_student(auth_user.user_id)
        .await?;
    Ok(Json(registrations.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/students/{number}/registrations",
    tag = "Registrations",
    operation_id = "listStudentRegistrations",
    summary = "List a student's active registrations",
    description = "Staff view of a student's active registrations by student number. Requires `registration:view_all` permission.",
    params(("number" = String, Path, description = "Student number")),
    responses(
        (status = 200, description = "Active registrations", body = Vec<RegistrationResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Student not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(number = %number))]
pub async fn student_registrations(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<Vec<RegistrationResponse>>, AppError> {
    auth_user.require_permission(permission::REGISTRATION_VIEW_ALL)?;

    let registrations = EnrollmentService::new(&state.db)
        .list_active_by_student_number(&number)
        .await?;
    Ok(Json(registrations.into_iter().map(Into::into).collect()))
}
