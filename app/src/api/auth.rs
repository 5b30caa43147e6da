use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use domain::user::UserId;

use super::AppState;
use super::error::ApiError;

const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
}

impl Claims {
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(TOKEN_LIFETIME_HOURS);

        Self {
            sub: user_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// HS256 keys derived from the configured secret
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Generate a token for the given user
    pub fn create_jwt(&self, user_id: UserId) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::default(), &Claims::new(user_id), &self.encoding)
    }

    /// Verify a token and return the user it was issued for
    pub fn verify_jwt(&self, token: &str) -> Result<UserId, ApiError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(|e| {
            debug!("Rejected token: {e}");
            ApiError::InvalidIdentity
        })?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| ApiError::InvalidIdentity)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// The acting user, taken from the `Authorization: Bearer` token. Handlers
/// that take this never run for anonymous requests.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::MissingIdentity)?;
        state.keys().verify_jwt(token).map(AuthUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let keys = JwtKeys::from_secret(b"test-secret");
        let user = Uuid::new_v4();
        let token = keys.create_jwt(user).unwrap();
        assert_eq!(keys.verify_jwt(&token).unwrap(), user);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let token = JwtKeys::from_secret(b"one").create_jwt(Uuid::new_v4()).unwrap();
        let result = JwtKeys::from_secret(b"two").verify_jwt(&token);
        assert!(matches!(result, Err(ApiError::InvalidIdentity)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let keys = JwtKeys::from_secret(b"test-secret");
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: (Utc::now() - Duration::hours(2)).timestamp(),
            iat: (Utc::now() - Duration::hours(26)).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(matches!(keys.verify_jwt(&token), Err(ApiError::InvalidIdentity)));
    }
}
