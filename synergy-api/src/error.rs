/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`. Errors render as the JSON envelope
/// the frontend expects:
///
/// ```json
/// {
///   "error": true,
///   "code": "forbidden",
///   "message": "Access denied to this project",
///   "timestamp": "2025-09-06T10:00:00Z"
/// }
/// ```
///
/// Validation failures add `details: [{ "field", "message" }]`.
///
/// # Example
///
/// ```
/// use synergy_api::error::{ApiError, ApiResult};
///
/// fn require_name(name: &str) -> ApiResult<&str> {
///     if name.trim().is_empty() {
///         return Err(ApiError::BadRequest("Project name is required".to_string()));
///     }
///     Ok(name)
/// }
///
/// assert!(require_name("  ").is_err());
/// ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use synergy_shared::auth::authorization::AuthzError;
use synergy_shared::auth::gotrue::GoTrueError;
use synergy_shared::auth::jwt::JwtError;
use synergy_shared::auth::middleware::AuthError;
use synergy_shared::models::notification::UnknownNotificationType;
use synergy_shared::models::project_member::InvalidRole;

/// Whether 500 responses carry the underlying error text
static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

/// Enables error details in 500 responses. Set once at startup in development.
pub fn expose_internal_errors(enabled: bool) {
    EXPOSE_INTERNAL_ERRORS.store(enabled, Ordering::Relaxed);
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Field validation failed (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `true`
    pub error: bool,

    /// Machine-readable code, e.g. `not_found`
    pub code: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,

    pub timestamp: DateTime<Utc>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::InternalError(_) => "internal_error",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    /// Single-field validation failure.
    pub fn invalid_field(field: &str, message: &str) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match self {
            ApiError::ValidationError(errors) => ("Validation failed".to_string(), Some(errors)),
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                if EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed) {
                    (msg, None)
                } else {
                    ("Internal server error".to_string(), None)
                }
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::ServiceUnavailable(msg) => (msg, None),
        };

        let body = Json(ErrorResponse {
            error: true,
            code: code.to_string(),
            message,
            details,
            timestamp: Utc::now(),
        });

        (status, body).into_response()
    }
}

/// Store errors: missing rows are 404, rejected input is 400, the rest 500.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::PoolTimedOut => {
                ApiError::ServiceUnavailable("Database temporarily unavailable".to_string())
            }
            sqlx::Error::Database(db_err) => {
                let invalid_input = matches!(
                    db_err.code().as_deref(),
                    Some("22P02") | Some("22007") | Some("22008") | Some("22001")
                );

                if db_err.is_unique_violation()
                    || db_err.is_foreign_key_violation()
                    || db_err.is_check_violation()
                    || invalid_input
                {
                    ApiError::BadRequest(db_err.message().to_string())
                } else {
                    ApiError::InternalError(format!("Database error: {}", db_err))
                }
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        AuthError::from(err).into()
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Forbidden(message) => ApiError::Forbidden(message.to_string()),
            AuthzError::ProjectNotFound => ApiError::NotFound("Project not found".to_string()),
            AuthzError::Database(e) => e.into(),
        }
    }
}

/// Auth-service failures. Sign-in maps its own rejections to 401.
impl From<GoTrueError> for ApiError {
    fn from(err: GoTrueError) -> Self {
        match &err {
            GoTrueError::Api { status, .. } if *status >= 500 => {
                ApiError::ServiceUnavailable(err.user_message())
            }
            GoTrueError::Api { .. } => ApiError::BadRequest(err.user_message()),
            GoTrueError::Transport(_) => ApiError::ServiceUnavailable(err.user_message()),
            GoTrueError::Decode(detail) => ApiError::InternalError(detail.clone()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                })
            })
            .collect();

        // field_errors() is a HashMap; keep the output stable
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

impl From<InvalidRole> for ApiError {
    fn from(err: InvalidRole) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<UnknownNotificationType> for ApiError {
    fn from(err: UnknownNotificationType) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
