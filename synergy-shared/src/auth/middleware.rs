/// Request authentication
///
/// Extracts the bearer token from the `Authorization` header, validates it
/// with [`validate_access_token`] and produces the [`AuthUser`] that handlers
/// receive through `Extension<AuthUser>`.
///
/// The API wraps [`authenticate`] in an axum middleware layer; the functions
/// here only depend on the request headers so they are easy to test.
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use synergy_shared::auth::jwt::{create_token, Claims};
/// use synergy_shared::auth::middleware::authenticate;
/// use uuid::Uuid;
///
/// let secret = "super-secret-jwt-token-with-at-least-32-characters";
/// let user_id = Uuid::new_v4();
/// let token = create_token(&Claims::new(user_id, None), secret).unwrap();
///
/// let mut headers = HeaderMap::new();
/// headers.insert(
///     header::AUTHORIZATION,
///     HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
/// );
///
/// let user = authenticate(&headers, secret).unwrap();
/// assert_eq!(user.id, user_id);
/// ```

use axum::http::{header, HeaderMap};
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::jwt::{validate_access_token, Claims, JwtError};

/// Authenticated requester, added to request extensions
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    /// Auth subject id, equal to `profiles.id`
    pub id: Uuid,

    pub email: Option<String>,

    /// Sign-up metadata from the token
    pub user_metadata: JsonValue,
}

impl AuthUser {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            user_metadata: claims.user_metadata,
        }
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata.get(key).and_then(JsonValue::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingCredentials,

    #[error("Invalid authorization header format")]
    InvalidFormat,

    #[error("Token expired")]
    Expired,

    #[error("Invalid or expired token")]
    InvalidToken(#[source] JwtError),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::Expired,
            other => AuthError::InvalidToken(other),
        }
    }
}

/// Returns the token of an `Authorization: Bearer <token>` header.
///
/// `Ok(None)` when the header is absent, `Err(InvalidFormat)` when it is
/// present but not a non-empty bearer credential.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| AuthError::InvalidFormat)?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(Some(token.trim()))
        }
        _ => Err(AuthError::InvalidFormat),
    }
}

/// Authenticates a request from its headers.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthUser, AuthError> {
    let token = bearer_token(headers)?.ok_or(AuthError::MissingCredentials)?;
    let claims = validate_access_token(token, secret)?;

    Ok(AuthUser::from_claims(claims))
}
