use serde::{Deserialize, Deserializer};

use crate::error::AppError;

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a trimmed text field of 1..=`max` Unicode characters.
pub fn validate_text(value: &str, field: &str, max: usize) -> Result<(), AppError> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be 1-{max} characters"
        )));
    }
    Ok(())
}

/// Validate a course code: 2-16 letters, digits or dashes.
pub fn validate_course_code(code: &str) -> Result<(), AppError> {
    let code = code.trim();
    let len = code.chars().count();
    if !(2..=16).contains(&len) {
        return Err(AppError::Validation(
            "Course code must be 2-16 characters".into(),
        ));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(AppError::Validation(
            "Course code must contain only letters, digits, and dashes".into(),
        ));
    }
    Ok(())
}

/// Validate a list of prerequisite codes (each a valid course code, at most 32).
pub fn validate_prerequisite_codes(codes: &[String]) -> Result<(), AppError> {
    if codes.len() > 32 {
        return Err(AppError::Validation(
            "At most 32 prerequisites are allowed".into(),
        ));
    }
    codes.iter().try_for_each(|code| validate_course_code(code))
}
