use common::MarksOutOfRange;
use sea_orm::{DbErr, SqlErr};

/// Expected, caller-recoverable failures of the registration and grading engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidGraph(String),
    #[error("{0}")]
    CapacityExceeded(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Map a unique-constraint violation to `Conflict(msg)`, anything else to `Database`.
    pub fn from_insert(err: DbErr, msg: impl Into<String>) -> Self {
        if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            EngineError::Conflict(msg.into())
        } else {
            EngineError::Database(err)
        }
    }
}

impl From<MarksOutOfRange> for EngineError {
    fn from(err: MarksOutOfRange) -> Self {
        EngineError::InvalidInput(err.to_string())
    }
}
