use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::permission;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::course::*;
use crate::services::CatalogService;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/courses",
    tag = "Courses",
    operation_id = "createCourse",
    summary = "Create a course",
    description = "Adds a course to the catalog. The code is compared case-insensitively and stored uppercase. Optional prerequisite codes must all exist. Requires `course:manage` permission.",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Prerequisite not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Code already exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(code = %payload.code))]
pub async fn create_course(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(permission::COURSE_MANAGE)?;
    validate_create_course(&payload)?;

    let created = CatalogService::new(&state.db)
        .add_course(payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(CourseResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/courses",
    tag = "Courses",
    operation_id = "listCourses",
    summary = "List all courses",
    description = "Returns every course, active or not, ordered by code. Requires `course:manage` permission.",
    responses(
        (status = 200, description = "All courses", body = Vec<CourseResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_courses(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, AppError> {
    auth_user.require_permission(permission::COURSE_MANAGE)?;

    let courses = CatalogService::new(&state.db).list_courses().await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/courses/{id}",
    tag = "Courses",
    operation_id = "getCourse",
    summary = "Get a course by ID",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course", body = CourseResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_course(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CourseResponse>, AppError> {
    auth_user.require_permission(permission::COURSE_MANAGE)?;

    let course = CatalogService::new(&state.db).get_course(id).await?;
    Ok(Json(course.into()))
}

#[utoipa::path(
    get,
    path = "/courses/code/{code}",
    tag = "Courses",
    operation_id = "getCourseByCode",
    summary = "Get a course by code",
    description = "Looks a course up by its code, ignoring case. Requires `course:manage` permission.",
    params(("code" = String, Path, description = "Course code")),
    responses(
        (status = 200, description = "Course", body = CourseResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(code = %code))]
pub async fn get_course_by_code(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<CourseResponse>, AppError> {
    auth_user.require_permission(permission::COURSE_MANAGE)?;

    let course = CatalogService::new(&state.db)
        .get_course_by_code(&code)
        .await?;
    Ok(Json(course.into()))
}

#[utoipa::path(
    patch,
    path = "/courses/{id}",
    tag = "Courses",
    operation_id = "updateCourse",
    summary = "Update a course",
    description = "Partially updates a course. Capacity cannot be lowered below the number of students currently registered. When `prerequisites` is present the prerequisite set is replaced in the same transaction. Requires `course:manage` permission.",
    params(("id" = i32, Path, description = "Course ID")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = CourseResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course or prerequisite not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Capacity below current registrations (CONFLICT)", body = ErrorBody),
        (status = 422, description = "Prerequisites would form a cycle (INVALID_GRAPH)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_course(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateCourseRequest>,
) -> Result<Json<CourseResponse>, AppError> {
    auth_user.require_permission(permission::COURSE_MANAGE)?;
    validate_update_course(&payload)?;

    let updated = CatalogService::new(&state.db)
        .update_course(id, payload.into())
        .await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/courses/{id}",
    tag = "Courses",
    operation_id = "deleteCourse",
    summary = "Delete a course",
    description = "Removes a course and its own prerequisite edges. Rejected while another course lists it as a prerequisite (the dependents are named in the message) or while it has registration or result history. Requires `course:manage` permission.",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Course still referenced (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_course(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(permission::COURSE_MANAGE)?;

    CatalogService::new(&state.db).remove_course(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/courses/{id}/prerequisites",
    tag = "Courses",
    operation_id = "setPrerequisites",
    summary = "Replace a course's prerequisites",
    description = "Resolves every code, rejects the update if it would make the prerequisite graph cyclic, then atomically replaces the prerequisite set. Requires `course:manage` permission.",
    params(("id" = i32, Path, description = "Course ID")),
    request_body = SetPrerequisitesRequest,
    responses(
        (status = 200, description = "New prerequisite set", body = Vec<CourseSummary>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course or prerequisite not found (NOT_FOUND)", body = ErrorBody),
        (status = 422, description = "Would introduce a cycle (INVALID_GRAPH)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn set_prerequisites(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<SetPrerequisitesRequest>,
) -> Result<Json<Vec<CourseSummary>>, AppError> {
    auth_user.require_permission(permission::COURSE_MANAGE)?;
    crate::models::shared::validate_prerequisite_codes(&payload.prerequisites)?;

    let prerequisites = CatalogService::new(&state.db)
        .set_prerequisites(id, &payload.prerequisites)
        .await?;
    Ok(Json(prerequisites.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/courses/{id}/prerequisites",
    tag = "Courses",
    operation_id = "getPrerequisites",
    summary = "List a course's prerequisites",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Direct prerequisites", body = Vec<CourseSummary>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_prerequisites(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<CourseSummary>>, AppError> {
    auth_user.require_permission(permission::COURSE_VIEW)?;

    let courses = CatalogService::new(&state.db).get_prerequisites(id).await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/courses/{id}/dependents",
    tag = "Courses",
    operation_id = "getDependents",
    summary = "List courses that require this course",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Direct dependents", body = Vec<CourseSummary>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_dependents(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<CourseSummary>>, AppError> {
    auth_user.require_permission(permission::COURSE_VIEW)?;

    let courses = CatalogService::new(&state.db).get_dependents(id).await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/catalog",
    tag = "Courses",
    operation_id = "listCatalog",
    summary = "Browse the active catalog",
    description = "Active courses ordered by code, each with an `available` flag telling whether a seat is free.",
    responses(
        (status = 200, description = "Active courses", body = Vec<CatalogEntry>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_catalog(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CatalogEntry>>, AppError> {
    auth_user.require_permission(permission::COURSE_VIEW)?;

    let courses = CatalogService::new(&state.db).list_active_courses().await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}
