use crate::store::StoreError;
use thiserror::Error;

/// Failures surfaced by the roster and attendance layers.
#[derive(Debug, Error)]
pub enum DataError {
    /// Rejected before any storage call.
    #[error("{0}")]
    Validation(String),
    #[error("roll no {roll_no} already exists in class {class}")]
    DuplicateRollNo { class: i64, roll_no: i64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type DataResult<T> = Result<T, DataError>;

impl DataError {
    pub fn validation(message: impl Into<String>) -> Self {
        DataError::Validation(message.into())
    }

    /// Protocol error code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            DataError::Validation(_) => "validation_error",
            DataError::DuplicateRollNo { .. } => "constraint_violation",
            DataError::Store(StoreError::ConstraintViolation { .. }) => "constraint_violation",
            DataError::Store(StoreError::NotFound { .. }) => "not_found",
            DataError::Store(_) => "db_query_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            DataError::DuplicateRollNo { class, roll_no } => Some(serde_json::json!({
                "reason": "duplicate_roll_no",
                "class": class,
                "rollNo": roll_no
            })),
            DataError::Store(StoreError::ConstraintViolation { collection, .. }) => {
                Some(serde_json::json!({ "collection": collection }))
            }
            DataError::Store(StoreError::NotFound { collection, key }) => {
                Some(serde_json::json!({ "collection": collection, "key": key }))
            }
            _ => None,
        }
    }
}
