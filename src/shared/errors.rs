use thiserror::Error;
use uuid::Uuid;

use crate::domain::reservation::{AllowedTransitions, ReservationStatus};

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Invalid state transition: {from} -> {to}. Allowed: {allowed}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
        allowed: AllowedTransitions,
    },

    #[error("Asset {0} is already booked for these dates")]
    SlotUnavailable(Uuid),

    #[error("Asset {0} is being booked by another request. Please try again.")]
    ResourceContended(Uuid),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Invalid callback signature")]
    InvalidSignature,

    #[error("Malformed callback: {0}")]
    MalformedCallback(String),

    #[error("Unknown transaction reference: {0}")]
    UnknownTransaction(String),

    #[error("Amount mismatch for {reference}: expected {expected}, got {actual}")]
    AmountMismatch {
        reference: String,
        expected: i64,
        actual: i64,
    },

    #[error("Unrecognized provider status '{status}' for {reference}")]
    UnrecognizedStatus { reference: String, status: String },

    #[error("Validation: {0}")]
    Validation(String),

    /// The database aborted the transaction because of a concurrent writer
    /// (SQLite busy/locked, PostgreSQL serialization failure or deadlock).
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field: "id",
            value: value.to_string(),
        }
    }

    /// Whether this error is likely transient and the operation may succeed
    /// if retried by the caller.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ResourceContended(_) | Self::TransactionConflict(_) | Self::Storage(_)
        )
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        if is_write_conflict(&e) {
            Self::TransactionConflict(e.to_string())
        } else {
            Self::Storage(e.to_string())
        }
    }
}

fn is_write_conflict(e: &sea_orm::DbErr) -> bool {
    use sea_orm::{sqlx, DbErr, RuntimeErr};

    let (DbErr::Exec(RuntimeErr::SqlxError(err))
    | DbErr::Query(RuntimeErr::SqlxError(err))
    | DbErr::Conn(RuntimeErr::SqlxError(err))) = e
    else {
        return false;
    };
    match err {
        sqlx::Error::Database(db) => db.code().is_some_and(|code| is_conflict_code(&code)),
        _ => false,
    }
}

/// PostgreSQL SQLSTATE `40001`/`40P01`, or an SQLite result code whose
/// primary code is `SQLITE_BUSY` (5) or `SQLITE_LOCKED` (6).
fn is_conflict_code(code: &str) -> bool {
    match code {
        "40001" | "40P01" => true,
        // SQLSTATEs are always five characters
        sqlite if sqlite.len() < 5 => sqlite
            .parse::<i32>()
            .is_ok_and(|c| matches!(c & 0xff, 5 | 6)),
        _ => false,
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_transition_message_is_actionable() {
        let err = DomainError::InvalidTransition {
            from: ReservationStatus::Cancelled,
            to: ReservationStatus::CheckedOut,
            allowed: AllowedTransitions::of(ReservationStatus::Cancelled),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition: CANCELLED -> CHECKED_OUT. Allowed: none (terminal state)"
        );
    }

    #[test]
    fn busy_and_serialization_codes_are_conflicts() {
        assert!(is_conflict_code("5"));
        assert!(is_conflict_code("517"));
        assert!(is_conflict_code("6"));
        assert!(is_conflict_code("40001"));
        assert!(is_conflict_code("40P01"));
        assert!(!is_conflict_code("2067"));
        assert!(!is_conflict_code("23505"));
        assert!(!is_conflict_code("19"));
    }

    #[test]
    fn contention_and_storage_are_transient() {
        assert!(DomainError::ResourceContended(Uuid::nil()).is_transient());
        assert!(DomainError::Storage("pool timed out".into()).is_transient());
        assert!(!DomainError::SlotUnavailable(Uuid::nil()).is_transient());
        assert!(!DomainError::InvalidSignature.is_transient());
    }
}
