use chrono::{DateTime, Utc};
use common::Identity;
use serde::{Deserialize, Serialize};

use super::shared::validate_text;
use crate::entity::user;
use crate::error::AppError;

/// Request body for provisioning an account.
///
/// The `role` field selects which identity attributes are expected:
/// `student` needs `student_number`, `lecturer` needs `staff_number`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    /// Unique username (1-32 chars, alphanumeric and underscores).
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "jdoe@uni.example")]
    pub email: String,
    /// Initial password (8-128 characters). Generated when omitted.
    pub password: Option<String>,
    #[schema(example = "Jane")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[serde(flatten)]
    pub identity: Identity,
}

pub fn validate_create_user(payload: &CreateUserRequest) -> Result<(), AppError> {
    let username = payload.username.trim();
    if username.is_empty() || username.chars().count() > 32 {
        return Err(AppError::Validation(
            "Username must be 1-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username must contain only letters, digits, and underscores".into(),
        ));
    }
    let email = payload.email.trim();
    if email.len() > 254 || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::Validation("Email address is invalid".into()));
    }
    if let Some(ref password) = payload.password
        && (password.len() < 8 || password.len() > 128)
    {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    validate_text(&payload.first_name, "First name", 64)?;
    validate_text(&payload.last_name, "Last name", 64)?;

    match &payload.identity {
        Identity::Admin => {}
        Identity::Lecturer {
            staff_number,
            department,
        } => {
            validate_text(staff_number, "Staff number", 32)?;
            if let Some(department) = department {
                validate_text(department, "Department", 128)?;
            }
        }
        Identity::Student {
            student_number,
            program,
            year,
        } => {
            validate_text(student_number, "Student number", 32)?;
            if let Some(program) = program {
                validate_text(program, "Program", 128)?;
            }
            if let Some(year) = year
                && !(1..=10).contains(year)
            {
                return Err(AppError::Validation("Year must be between 1 and 10".into()));
            }
        }
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "jdoe@uni.example")]
    pub email: String,
    #[schema(example = "Jane Doe")]
    pub full_name: String,
    #[serde(flatten)]
    pub identity: Identity,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            identity: user.identity(),
            full_name: user.full_name(),
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Response to a provisioning request.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CreateUserResponse {
    pub user: UserResponse,
    /// Present only when the password was generated; shown once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
}
