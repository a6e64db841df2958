/// Client for the hosted auth service's REST API (GoTrue)
///
/// Sign-up, password sign-in and sign-out are delegated to the auth service.
/// Every request carries the project's anon key in the `apikey` header.
///
/// | Operation | Endpoint |
/// |-----------|----------|
/// | sign up   | `POST /auth/v1/signup` |
/// | sign in   | `POST /auth/v1/token?grant_type=password` |
/// | sign out  | `POST /auth/v1/logout` (bearer token) |
///
/// # Example
///
/// ```no_run
/// use synergy_shared::auth::gotrue::GoTrueClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GoTrueClient::new("https://example.supabase.co", "anon-key")?;
/// let session = client.sign_in_with_password("ada@example.com", "hunter22").await?;
/// println!("signed in as {}", session.user.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Upper bound for any single auth-service call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum GoTrueError {
    /// The auth service answered with a non-success status
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Auth service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected auth service response: {0}")]
    Decode(String),
}

impl GoTrueError {
    /// Message suitable for the client.
    ///
    /// Known provider phrasings are replaced by friendlier ones.
    pub fn user_message(&self) -> String {
        match self {
            GoTrueError::Api { message, .. } => {
                if message.contains("Invalid login credentials") {
                    "Invalid email or password".to_string()
                } else if message.contains("Email not confirmed") {
                    "Please verify your email address".to_string()
                } else {
                    message.clone()
                }
            }
            GoTrueError::Transport(_) => "Authentication service unavailable".to_string(),
            GoTrueError::Decode(_) => "Unexpected response from authentication service".to_string(),
        }
    }
}

/// Account as returned by the auth service
///
/// Fields the API does not read are kept in `extra` so the account is passed
/// to the client unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoTrueUser {
    pub id: Uuid,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub user_metadata: JsonValue,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl GoTrueUser {
    pub fn needs_verification(&self) -> bool {
        self.email_confirmed_at.is_none()
    }
}

/// Signed-in session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub expires_in: Option<i64>,

    pub user: GoTrueUser,
}

/// Sign-up returns a session when email confirmation is disabled and the bare
/// account otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(Session),
    User(GoTrueUser),
}

impl SignUpResponse {
    pub fn user(&self) -> &GoTrueUser {
        match self {
            SignUpResponse::Session(session) => &session.user,
            SignUpResponse::User(user) => user,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SignUpResponse::Session(session) => Some(session),
            SignUpResponse::User(_) => None,
        }
    }
}

/// Pulls the human-readable message out of an auth-service error body.
///
/// The service uses `msg`, `error_description`, `message` or `error`
/// depending on the endpoint and version.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;

    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(JsonValue::as_str))
        .map(str::to_string)
}

#[derive(Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl GoTrueClient {
    /// `base_url` is the project URL, without the `/auth/v1` suffix.
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self, GoTrueError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Registers an account with first and last name stored as user metadata.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<SignUpResponse, GoTrueError> {
        let body = json!({
            "email": email,
            "password": password,
            "data": {
                "first_name": first_name,
                "last_name": last_name,
            },
        });

        let response = self
            .http
            .post(self.endpoint("signup"))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        let response = Self::check(response).await?;
        debug!("Sign-up accepted by auth service");

        response
            .json::<SignUpResponse>()
            .await
            .map_err(|e| GoTrueError::Decode(e.to_string()))
    }

    /// Password grant.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, GoTrueError> {
        let response = self
            .http
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let response = Self::check(response).await?;

        response
            .json::<Session>()
            .await
            .map_err(|e| GoTrueError::Decode(e.to_string()))
    }

    /// Revokes the session that `access_token` belongs to.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), GoTrueError> {
        let response = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GoTrueError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("Auth service returned {}", status));

        warn!(status = status.as_u16(), error = %message, "Auth service rejected request");

        Err(GoTrueError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_paths() {
        let client = GoTrueClient::new("https://example.supabase.co/", "anon").unwrap();
        assert_eq!(client.endpoint("signup"), "https://example.supabase.co/auth/v1/signup");
        assert_eq!(
            client.endpoint("/token?grant_type=password"),
            "https://example.supabase.co/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn test_extract_error_message_variants() {
        assert_eq!(
            extract_error_message(r#"{"code":400,"msg":"User already registered"}"#).as_deref(),
            Some("User already registered")
        );
        assert_eq!(
            extract_error_message(
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
            )
            .as_deref(),
            Some("Invalid login credentials")
        );
        assert_eq!(
            extract_error_message(r#"{"message":"Email not confirmed"}"#).as_deref(),
            Some("Email not confirmed")
        );
        assert_eq!(extract_error_message("<html>bad gateway</html>"), None);
    }

    #[test]
    fn test_user_message_rewrites_known_errors() {
        let invalid = GoTrueError::Api {
            status: 400,
            message: "Invalid login credentials".to_string(),
        };
        assert_eq!(invalid.user_message(), "Invalid email or password");

        let unconfirmed = GoTrueError::Api {
            status: 400,
            message: "Email not confirmed".to_string(),
        };
        assert_eq!(unconfirmed.user_message(), "Please verify your email address");

        let other = GoTrueError::Api {
            status: 422,
            message: "Password should be at least 6 characters".to_string(),
        };
        assert_eq!(other.user_message(), "Password should be at least 6 characters");
    }

    #[test]
    fn test_sign_up_response_with_session() {
        let id = Uuid::new_v4();
        let body = json!({
            "access_token": "at",
            "refresh_token": "rt",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": {
                "id": id,
                "email": "ada@example.com",
                "email_confirmed_at": "2025-09-06T10:00:00Z",
                "user_metadata": { "first_name": "Ada" },
                "aud": "authenticated"
            }
        });

        let parsed: SignUpResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.session().map(|s| s.access_token.as_str()), Some("at"));
        assert_eq!(parsed.user().id, id);
        assert!(!parsed.user().needs_verification());
        assert_eq!(parsed.user().extra["aud"], "authenticated");
    }

    #[test]
    fn test_sign_up_response_without_session() {
        let id = Uuid::new_v4();
        let body = json!({
            "id": id,
            "email": "grace@example.com",
            "email_confirmed_at": null,
            "confirmation_sent_at": "2025-09-06T10:00:00Z"
        });

        let parsed: SignUpResponse = serde_json::from_value(body).unwrap();
        assert!(parsed.session().is_none());
        assert_eq!(parsed.user().id, id);
        assert!(parsed.user().needs_verification());
    }
}
