//! The module contains the error the engine can throw.
//!
//! Validation errors ([`InvalidInput`], [`InsufficientBudget`]) are raised
//! before any write. [`KeyNotFound`] is a non-fatal signal, not an abort of
//! an unrelated batch. [`Database`] wraps store failures; connection-level
//! ones are transient and retryable.
//!
//! [`InvalidInput`]: EngineError::InvalidInput
//! [`InsufficientBudget`]: EngineError::InsufficientBudget
//! [`KeyNotFound`]: EngineError::KeyNotFound
//! [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Insufficient budget: {0}")]
    InsufficientBudget(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Already shared: {0}")]
    AlreadyShared(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` for store failures that are retryable with backoff,
    /// as opposed to validation or authorization failures that are
    /// definitive for the request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Database(DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::InsufficientBudget(a), Self::InsufficientBudget(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::AlreadyShared(a), Self::AlreadyShared(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::RuntimeErr;

    use super::*;

    #[test]
    fn connection_failures_are_transient() {
        let error = EngineError::from(DbErr::Conn(RuntimeErr::Internal(
            "connection reset".to_string(),
        )));
        assert!(error.is_transient());
    }

    #[test]
    fn validation_and_query_failures_are_not_transient() {
        assert!(!EngineError::InvalidInput("bad name".to_string()).is_transient());
        assert!(!EngineError::KeyNotFound("user".to_string()).is_transient());
        assert!(!EngineError::from(DbErr::Custom("constraint".to_string())).is_transient());
    }
}
