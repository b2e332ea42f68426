//! The module contains the errors the ledger can return.
//!
//! The taxonomy mirrors how callers are expected to react:
//!
//! - [`Validation`] — malformed input, rejected before any write.
//! - [`NotFound`] — a referenced row does not exist (or the actor may not
//!   see it).
//! - [`Conflict`] — an optimistic check failed; the whole operation may be
//!   retried.
//! - [`Precondition`] — a guard refused the operation (e.g. removing a
//!   member with an outstanding balance); actionable by the end user, not
//!   retryable as-is.
//! - [`Database`] — the underlying store failed; nothing partial was
//!   committed.
//!
//! Cache drift detected by the reconciler is *not* an error: it is repaired
//! in place and logged.
//!
//! [`Validation`]: LedgerError::Validation
//! [`NotFound`]: LedgerError::NotFound
//! [`Conflict`]: LedgerError::Conflict
//! [`Precondition`]: LedgerError::Precondition
//! [`Database`]: LedgerError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Precondition(a), Self::Precondition(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
