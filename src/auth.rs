//! Credential hashing and session tokens.
//!
//! Passwords are stored as Argon2id PHC strings with a random salt per record.
//! Sessions are stateless HS256 JWTs bound to a user id with a fixed lifetime.

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, PasswordHash,
};
use bson::oid::ObjectId;
use chrono::{Duration, Utc};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("failed to verify password: {0}")]
    Verify(String),

    #[error("invalid password hash format")]
    InvalidHash,
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Returns `Ok(false)` on a mismatch; errors are reserved for unusable hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Verify(e.to_string())),
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Longest session lifetime accepted from configuration: one year.
pub const MAX_SESSION_TTL_MINUTES: i64 = 60 * 24 * 365;

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("ttl", &self.ttl)
            .field("keys", &"[hidden]")
            .finish()
    }
}

impl SessionIssuer {
    /// Lifetimes beyond [`MAX_SESSION_TTL_MINUTES`] in either direction are
    /// clamped to it.
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        let ttl_minutes = ttl_minutes.clamp(-MAX_SESSION_TTL_MINUTES, MAX_SESSION_TTL_MINUTES);
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::try_minutes(ttl_minutes).unwrap_or_default(),
        }
    }

    pub fn issue(&self, user_id: ObjectId) -> Result<String, AppError> {
        let issued_at = Utc::now();
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal("session expiry is out of range".to_string()))?;
        let claims = Claims {
            user_id: user_id.to_hex(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("failed to sign session token: {e}")))
    }

    /// Resolves a token to the user it was issued for. Expired, tampered or
    /// malformed tokens are all `Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<ObjectId, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default()).map_err(|e| {
            tracing::debug!(error = %e, "rejected session token");
            AppError::Unauthorized
        })?;
        ObjectId::parse_str(&data.claims.user_id).map_err(|_| AppError::Unauthorized)
    }
}

/// The user behind the request's `Authorization: Bearer` token.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AuthenticatedUser(pub ObjectId);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(request: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(request))
    }
}

fn authenticate(request: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let sessions = request
        .app_data::<web::Data<SessionIssuer>>()
        .ok_or_else(|| AppError::Internal("session issuer is not registered".to_string()))?;
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;
    sessions.verify(token.trim()).map(AuthenticatedUser)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn hashes_are_salted_and_verifiable() {
        let first = hash_password("hunter22").unwrap();
        let second = hash_password("hunter22").unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(verify_password("hunter22", &first).unwrap());
        assert!(!verify_password("hunter23", &first).unwrap());
    }

    #[test]
    fn garbage_hash_is_rejected() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(PasswordError::InvalidHash)
        ));
    }

    #[test]
    fn token_round_trips_to_user() {
        let sessions = SessionIssuer::new("test-secret", 60);
        let user_id = ObjectId::new();
        let token = sessions.issue(user_id).unwrap();

        assert_eq!(sessions.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let sessions = SessionIssuer::new("test-secret", -10);
        let token = sessions.issue(ObjectId::new()).unwrap();

        assert!(matches!(sessions.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn oversized_lifetime_is_clamped() {
        for ttl_minutes in [200_000_000_000, i64::MAX / 2, i64::MAX] {
            let sessions = SessionIssuer::new("test-secret", ttl_minutes);
            let token = sessions.issue(ObjectId::new()).unwrap();
            let claims = decode::<Claims>(&token, &sessions.decoding_key, &Validation::default())
                .unwrap()
                .claims;

            assert_eq!(claims.exp - claims.iat, MAX_SESSION_TTL_MINUTES * 60);
        }
    }

    #[test]
    fn token_from_other_secret_is_unauthorized() {
        let token = SessionIssuer::new("one", 60).issue(ObjectId::new()).unwrap();

        assert!(matches!(
            SessionIssuer::new("two", 60).verify(&token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn extractor_reads_bearer_header() {
        let sessions = SessionIssuer::new("test-secret", 60);
        let user_id = ObjectId::new();
        let token = sessions.issue(user_id).unwrap();

        let request = TestRequest::default()
            .app_data(web::Data::new(sessions.clone()))
            .insert_header((AUTHORIZATION, format!("Bearer {token}")))
            .to_http_request();
        assert_eq!(authenticate(&request).unwrap(), AuthenticatedUser(user_id));

        let anonymous = TestRequest::default()
            .app_data(web::Data::new(sessions))
            .to_http_request();
        assert!(matches!(authenticate(&anonymous), Err(AppError::Unauthorized)));
    }
}
