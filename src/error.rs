//! Error taxonomy shared by the session, resume and auth components.
//!
//! Storage implementations return [`StorageError`], which carries the only
//! classification the retry policy looks at. Business components return
//! [`CoreError`], whose variants map one-to-one to stable response codes for
//! the controller layer.

use thiserror::Error;

/// Message used for every authentication failure, so that callers can never
/// tell a wrong password from an unknown account.
pub const AUTHENTICATION_FAILED: &str = "Invalid credentials or session";

#[derive(Debug, Error)]
pub enum StorageError {
    /// Operational failure that is likely to succeed if retried
    /// (busy/locked database, IO hiccup, connection drop).
    #[error("transient storage failure: {0}")]
    Transient(String),

    /// A constraint was violated (unique, foreign key, not null...).
    #[error("storage integrity violation: {0}")]
    Integrity(String),

    /// Anything else, retrying won't help.
    #[error("storage failure: {0}")]
    Fatal(String),
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient(_))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match &err {
            rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::SystemIoFailure
                | ErrorCode::CannotOpen
                | ErrorCode::DiskFull
                | ErrorCode::FileLockingProtocolFailed => StorageError::Transient(err.to_string()),
                ErrorCode::ConstraintViolation => StorageError::Integrity(err.to_string()),
                _ => StorageError::Fatal(err.to_string()),
            },
            _ => StorageError::Fatal(err.to_string()),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                StorageError::Transient(err.to_string())
            }
            _ => StorageError::Fatal(err.to_string()),
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("{}", AUTHENTICATION_FAILED)]
    Authentication,

    #[error("illegal state: {0}")]
    State(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("service unavailable: {0}")]
    TransientStorage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable code for the controller layer.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::Authorization(_) => "FORBIDDEN",
            CoreError::Authentication => "UNAUTHENTICATED",
            CoreError::State(_) => "INVALID_STATE",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::TransientStorage(_) => "UNAVAILABLE",
            CoreError::Internal(_) => "INTERNAL",
        }
    }

    /// HTTP-equivalent status the controller layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::Validation(_) => 400,
            CoreError::Authentication => 401,
            CoreError::Authorization(_) => 403,
            CoreError::NotFound(_) => 404,
            CoreError::Conflict(_) => 409,
            CoreError::State(_) => 422,
            CoreError::Internal(_) => 500,
            CoreError::TransientStorage(_) => 503,
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Transient(msg) => CoreError::TransientStorage(msg),
            StorageError::Integrity(msg) => CoreError::Conflict(msg),
            StorageError::Fatal(msg) => CoreError::Internal(msg),
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn busy_and_locked_are_transient() {
        let busy: StorageError = sqlite_failure(rusqlite::ffi::SQLITE_BUSY).into();
        let locked: StorageError = sqlite_failure(rusqlite::ffi::SQLITE_LOCKED).into();
        let io: StorageError = sqlite_failure(rusqlite::ffi::SQLITE_IOERR).into();

        assert!(busy.is_transient());
        assert!(locked.is_transient());
        assert!(io.is_transient());
    }

    #[test]
    fn constraint_violation_is_integrity() {
        let err: StorageError = sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT).into();
        assert!(matches!(err, StorageError::Integrity(_)));
    }

    #[test]
    fn other_sqlite_errors_are_fatal() {
        let err: StorageError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StorageError::Fatal(_)));

        let err: StorageError = sqlite_failure(rusqlite::ffi::SQLITE_CORRUPT).into();
        assert!(matches!(err, StorageError::Fatal(_)));
    }

    #[test]
    fn io_error_classification() {
        let timeout: StorageError =
            std::io::Error::new(std::io::ErrorKind::TimedOut, "slow disk").into();
        assert!(timeout.is_transient());

        let denied: StorageError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(denied, StorageError::Fatal(_)));
    }

    #[test]
    fn storage_errors_map_to_core_errors() {
        assert!(matches!(
            CoreError::from(StorageError::Transient("x".into())),
            CoreError::TransientStorage(_)
        ));
        assert!(matches!(
            CoreError::from(StorageError::Integrity("x".into())),
            CoreError::Conflict(_)
        ));
        assert!(matches!(
            CoreError::from(StorageError::Fatal("x".into())),
            CoreError::Internal(_)
        ));
    }

    #[test]
    fn authentication_message_is_generic() {
        assert_eq!(CoreError::Authentication.to_string(), AUTHENTICATION_FAILED);
        assert_eq!(CoreError::Authentication.status_code(), 401);
        assert_eq!(CoreError::TransientStorage("db".into()).status_code(), 503);
    }
}
