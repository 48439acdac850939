//! Session Authentication
//!
//! Resolves an opaque bearer credential to a user identity. The credential
//! reaches the server over two paths that converge on the same
//! [`SessionAuthenticator::verify`] call: attached to the WebSocket
//! handshake as a query parameter, or in-band as an `auth` message after
//! the socket is open. Both paths accept an optional `Bearer ` scheme
//! prefix, which is stripped before verification.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::backend::error::AuthError;
use crate::backend::store::SocialStore;

/// A verified user identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: i64,
    pub username: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Username
    pub username: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// Verifies bearer credentials against the shared secret and resolves them
/// to known users.
pub struct SessionAuthenticator {
    secret: String,
    store: Arc<dyn SocialStore>,
}

impl SessionAuthenticator {
    pub fn new(secret: impl Into<String>, store: Arc<dyn SocialStore>) -> Self {
        Self {
            secret: secret.into(),
            store,
        }
    }

    /// Verify a credential and resolve the user it names.
    ///
    /// Calling this twice with the same credential yields the same
    /// identity; binding it twice onto one connection must stay idempotent
    /// at the registry layer.
    pub async fn verify(&self, credential: &str) -> Result<UserIdentity, AuthError> {
        let token = credential.strip_prefix("Bearer ").unwrap_or(credential);

        let key = DecodingKey::from_secret(self.secret.as_ref());
        let data = decode::<Claims>(token, &key, &Validation::default()).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            }
        })?;

        let user_id: i64 = data
            .claims
            .sub
            .parse()
            .map_err(|_| AuthError::InvalidToken)?;

        match self.store.get_user(user_id).await {
            Ok(Some(_)) => Ok(UserIdentity {
                id: user_id,
                username: data.claims.username,
            }),
            Ok(None) => Err(AuthError::UnknownUser),
            Err(e) => {
                tracing::warn!("[Auth] Store lookup failed for user {}: {}", user_id, e);
                Err(AuthError::UnknownUser)
            }
        }
    }

    /// Create a token for a user.
    ///
    /// The platform's account service issues tokens in production; this is
    /// used by tooling and tests.
    pub fn issue(
        &self,
        user_id: i64,
        username: &str,
        ttl_secs: u64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp: now + ttl_secs,
            iat: now,
        };

        let key = EncodingKey::from_secret(self.secret.as_ref());
        encode(&Header::default(), &claims, &key)
    }
}
