//! Error types for the value stores.
//!
//! Every fallible operation in the library returns [`Result<T>`], aliased to
//! `Result<T, StoreError>`. Storage failures coming out of sqlx are sorted into
//! two buckets when they are converted:
//!
//! - **transient**: the statement may succeed if issued again (I/O, pool
//!   timeout, serialization failure, deadlock, SQLite busy). The stores retry
//!   these with backoff before giving up.
//! - **fatal**: schema mismatch, constraint violation, bad SQL. Never retried.
//!
//! Input validation and blob decoding fail before any storage call with
//! [`StoreError::InvalidInput`] and [`StoreError::MalformedEncoding`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed compact encoding at token {token:?}: {reason}")]
    MalformedEncoding { token: String, reason: String },

    #[error("Transient storage error after {attempts} attempt(s): {source}")]
    TransientStorage {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    Fatal(#[source] sqlx::Error),
}

impl StoreError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        StoreError::InvalidInput(msg.into())
    }

    pub fn malformed(token: &str, reason: impl Into<String>) -> Self {
        StoreError::MalformedEncoding {
            token: token.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the caller may safely resubmit the whole batch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::TransientStorage { .. })
    }
}

// SQLSTATE codes that mean "try again": serialization_failure,
// deadlock_detected, lock_not_available, admin_shutdown, cannot_connect_now.
const TRANSIENT_SQLSTATES: &[&str] = &["40001", "40P01", "55P03", "57P01", "57P03"];

// SQLITE_BUSY and SQLITE_LOCKED primary result codes.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => {
                if TRANSIENT_SQLSTATES.contains(&&*code) {
                    return true;
                }
                // SQLite reports extended result codes; the low byte is the primary code
                code.parse::<i32>()
                    .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
                    .unwrap_or(false)
            }
            None => false,
        },
        _ => false,
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_transient(&err) {
            StoreError::TransientStorage {
                attempts: 1,
                source: err,
            }
        } else {
            StoreError::Fatal(err)
        }
    }
}
