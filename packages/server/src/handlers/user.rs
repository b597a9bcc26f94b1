use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use common::{Identity, permission};
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::user::{CreateUserRequest, CreateUserResponse, validate_create_user};
use crate::state::AppState;
use crate::utils::{hash, password};

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    operation_id = "createUser",
    summary = "Provision an account",
    description = "Creates an admin, lecturer, or student account. The `role` field selects the identity attributes. When `password` is omitted a random one is generated and returned once. Requires `user:manage` permission.",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = CreateUserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Username, email or identity number in use (USERNAME_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(username = %payload.username, role = %payload.identity.role()))]
pub async fn create_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(permission::USER_MANAGE)?;
    validate_create_user(&payload)?;

    let generated = payload.password.is_none().then(password::generate);
    let plain = payload
        .password
        .as_deref()
        .or(generated.as_deref())
        .unwrap_or_default();
    let hash = hash::hash_password(plain)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let mut model = user::ActiveModel {
        username: Set(payload.username.trim().to_string()),
        email: Set(payload.email.trim().to_lowercase()),
        password: Set(hash),
        role: Set(payload.identity.role()),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        student_number: Set(None),
        program: Set(None),
        year: Set(None),
        staff_number: Set(None),
        department: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    match payload.identity {
        Identity::Admin => {}
        Identity::Lecturer {
            staff_number,
            department,
        } => {
            model.staff_number = Set(Some(staff_number.trim().to_string()));
            model.department = Set(department);
        }
        Identity::Student {
            student_number,
            program,
            year,
        } => {
            model.student_number = Set(Some(student_number.trim().to_string()));
            model.program = Set(program);
            model.year = Set(year);
        }
    }

    let created = model.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::UsernameTaken,
        _ => AppError::from(e),
    })?;

    tracing::info!(
        user_id = created.id,
        role = %created.role,
        by = auth_user.user_id,
        "User provisioned"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            user: created.into(),
            generated_password: generated,
        }),
    ))
}
