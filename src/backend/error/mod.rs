//! Backend Error Types
//!
//! The error taxonomy of the realtime subsystem. The layers are kept
//! separate on purpose:
//!
//! - `AuthError` is connection-level: it refuses the upgrade when raised at
//!   handshake time, and becomes an `error` push (socket stays open) when
//!   raised from an in-band `auth` message.
//! - `FriendshipError` is operation-level: converted at the connection
//!   handler boundary into an `error` push to the originating connection,
//!   never fatal to the connection or the registry.
//! - `StoreError` is logged and degrades consistency between in-memory
//!   presence and durable status; it never aborts an in-memory operation
//!   that already happened.

use thiserror::Error;

/// Credential verification failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// The token is malformed or its signature does not verify.
    #[error("invalid token")]
    InvalidToken,
    /// The token verified but has expired.
    #[error("token expired")]
    Expired,
    /// The token names a user the store does not know.
    #[error("unknown user")]
    UnknownUser,
}

/// Durable-store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Friendship operation failures.
///
/// "Relation not found" is a request error; "counterparty offline" is not
/// an error at all but a delivery degradation, so it never appears here.
#[derive(Debug, Error)]
pub enum FriendshipError {
    #[error("cannot send a friend request to yourself")]
    SelfRequest,
    #[error("a relation between these users already exists")]
    DuplicateRequest,
    #[error("no matching relation found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(AuthError::InvalidToken.to_string(), "invalid token");
        assert_eq!(AuthError::Expired.to_string(), "token expired");
        assert_eq!(
            FriendshipError::SelfRequest.to_string(),
            "cannot send a friend request to yourself"
        );
        assert_eq!(
            FriendshipError::NotFound.to_string(),
            "no matching relation found"
        );
    }

    #[test]
    fn test_store_error_wraps_into_friendship_error() {
        let store_err = StoreError::Database(sqlx::Error::RowNotFound);
        let err: FriendshipError = store_err.into();
        assert!(matches!(err, FriendshipError::Store(_)));
    }
}
