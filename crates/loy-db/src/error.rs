//! Repository error taxonomy.
//!
//! Each variant drives a distinct caller behavior (see `loy-pipeline` and the
//! daemon route handlers); nothing here is ever fatal to the process.

use std::fmt;

/// All failures the persistence layer can surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    /// Connectivity loss or an unexpected database failure. The current
    /// operation is aborted; the cycle continues with the remaining orders.
    StorageUnavailable(String),
    /// The record exists but belongs to someone else, or a state transition
    /// raced with another writer. Callers treat this as already-satisfied.
    Conflict,
    /// The exact record already exists for the same owner.
    AlreadyExists,
    /// No such record.
    NotFound,
    /// Debit rejected: the user's current balance is smaller than the
    /// requested amount. No state was mutated.
    InsufficientFunds,
    /// Login/password pair did not match a user.
    BadCredentials,
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoError::StorageUnavailable(msg) => write!(f, "storage unavailable: {msg}"),
            RepoError::Conflict => write!(f, "conflict"),
            RepoError::AlreadyExists => write!(f, "already exists"),
            RepoError::NotFound => write!(f, "not found"),
            RepoError::InsufficientFunds => write!(f, "insufficient funds"),
            RepoError::BadCredentials => write!(f, "bad credentials"),
        }
    }
}

impl std::error::Error for RepoError {}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                // unique_violation — disambiguated at the call site where the
                // owner is known; the raw mapping is the safer Conflict.
                RepoError::Conflict
            }
            _ => RepoError::StorageUnavailable(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RepoError;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert_eq!(
            RepoError::from(sqlx::Error::RowNotFound),
            RepoError::NotFound
        );
    }

    #[test]
    fn display_is_stable() {
        assert_eq!(RepoError::InsufficientFunds.to_string(), "insufficient funds");
        assert_eq!(
            RepoError::StorageUnavailable("pool timed out".into()).to_string(),
            "storage unavailable: pool timed out"
        );
    }
}
