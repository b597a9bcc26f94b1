use axum::Json;
use axum::extract::{Path, State};
use common::permission;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::result::ResultResponse;
use crate::services::GradingService;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/me/results",
    tag = "Results",
    operation_id = "listMyResults",
    summary = "List my released results",
    description = "Only results the lecturer has released are returned. Requires `result:view_own` permission.",
    responses(
        (status = 200, description = "Released results", body = Vec<ResultResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(student_id = auth_user.user_id))]
pub async fn my_results(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ResultResponse>>, AppError> {
    auth_user.require_permission(permission::RESULT_VIEW_OWN)?;

    let results = GradingService::new(&state.db)
        .student_view(auth_user.user_id)
        .await?;
    Ok(Json(results.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/students/{number}/results",
    tag = "Results",
    operation_id = "listStudentResults",
    summary = "List a student's released results",
    description = "Staff view by student number; unreleased results are excluded here too. Requires `result:view_all` permission.",
    params(("number" = String, Path, description = "Student number")),
    responses(
        (status = 200, description = "Released results", body = Vec<ResultResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Student not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(number = %number))]
pub async fn student_results(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<Vec<ResultResponse>>, AppError> {
    auth_user.require_permission(permission::RESULT_VIEW_ALL)?;

    let results = GradingService::new(&state.db)
        .student_view_by_number(&number)
        .await?;
    Ok(Json(results.into_iter().map(Into::into).collect()))
}
