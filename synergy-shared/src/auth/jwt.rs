/// Access token validation
///
/// Sessions are issued by the hosted auth service (GoTrue). Its access tokens
/// are HS256 JWTs signed with the project's JWT secret, so the API validates
/// them locally instead of calling the auth service on every request.
///
/// # Validation
///
/// - **Algorithm**: HS256 only
/// - **Expiration**: `exp` is required and checked
/// - **Audience**: must be `authenticated` (anonymous tokens are rejected)
///
/// # Example
///
/// ```
/// use synergy_shared::auth::jwt::{create_token, validate_access_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "super-secret-jwt-token-with-at-least-32-characters";
/// let user_id = Uuid::new_v4();
///
/// let claims = Claims::new(user_id, Some("ada@example.com".to_string()));
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_access_token(&token, secret)?;
/// assert_eq!(validated.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Audience carried by tokens of signed-in users
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Lifetime of tokens minted by [`Claims::new`]
pub const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Token audience is not '{}'", AUTHENTICATED_AUDIENCE)]
    InvalidAudience,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Claims of an auth-service access token
///
/// Only the fields the API reads are modelled; unknown claims are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id, equal to `profiles.id`
    pub sub: Uuid,

    /// `authenticated` for signed-in users
    pub aud: String,

    pub exp: i64,

    #[serde(default)]
    pub iat: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Sign-up metadata (`first_name`, `last_name`)
    #[serde(default)]
    pub user_metadata: JsonValue,
}

impl Claims {
    /// Claims for an authenticated user, valid for one hour.
    pub fn new(user_id: Uuid, email: Option<String>) -> Self {
        Self::with_expiration(user_id, email, Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECONDS))
    }

    pub fn with_expiration(user_id: Uuid, email: Option<String>, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            aud: AUTHENTICATED_AUDIENCE.to_string(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
            iss: None,
            email,
            role: Some(AUTHENTICATED_AUDIENCE.to_string()),
            user_metadata: JsonValue::Object(Default::default()),
        }
    }

    /// Reads a string field from `user_metadata`.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata.get(key).and_then(JsonValue::as_str)
    }
}

/// Signs `claims` with HS256.
///
/// The API never issues sessions itself; this exists for tests and tooling
/// that need tokens the middleware accepts.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Verifies signature, expiry and audience and returns the claims.
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUTHENTICATED_AUDIENCE]);
    validation.set_required_spec_claims(&["exp", "sub", "aud"]);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidAudience => JwtError::InvalidAudience,
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::Invalid(e.to_string()),
    })?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "test-secret-key-that-is-at-least-32-bytes";

    #[test]
    fn test_create_and_validate() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Some("ada@example.com".to_string()));
        let token = create_token(&claims, SECRET).expect("should sign");

        let validated = validate_access_token(&token, SECRET).expect("should validate");
        assert_eq!(validated.sub, user_id);
        assert_eq!(validated.email.as_deref(), Some("ada@example.com"));
        assert_eq!(validated.aud, AUTHENTICATED_AUDIENCE);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token(&Claims::new(Uuid::new_v4(), None), SECRET).unwrap();
        let result = validate_access_token(&token, "another-secret-key-that-is-32-bytes-long");
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = Claims::with_expiration(Uuid::new_v4(), None, Duration::seconds(-3600));
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(validate_access_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_anonymous_audience_rejected() {
        let mut claims = Claims::new(Uuid::new_v4(), None);
        claims.aud = "anon".to_string();
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(
            validate_access_token(&token, SECRET),
            Err(JwtError::InvalidAudience)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            validate_access_token("not.a.jwt", SECRET),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn test_metadata_lookup() {
        let mut claims = Claims::new(Uuid::new_v4(), None);
        claims.user_metadata = json!({ "first_name": "Ada", "age": 36 });

        assert_eq!(claims.metadata_str("first_name"), Some("Ada"));
        assert_eq!(claims.metadata_str("age"), None);
        assert_eq!(claims.metadata_str("last_name"), None);
    }

    #[test]
    fn test_decodes_provider_shaped_token() {
        let user_id = Uuid::new_v4();
        let payload = json!({
            "sub": user_id,
            "aud": "authenticated",
            "exp": Utc::now().timestamp() + 600,
            "iat": Utc::now().timestamp(),
            "iss": "https://example.supabase.co/auth/v1",
            "email": "grace@example.com",
            "phone": "",
            "role": "authenticated",
            "app_metadata": { "provider": "email" },
            "user_metadata": { "first_name": "Grace", "last_name": "Hopper" },
            "session_id": Uuid::new_v4(),
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let claims = validate_access_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.metadata_str("last_name"), Some("Hopper"));
        assert_eq!(claims.iss.as_deref(), Some("https://example.supabase.co/auth/v1"));
    }
}
