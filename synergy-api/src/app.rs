/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use synergy_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config)?;
/// let app = synergy_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::{ApiError, ApiResult},
    middleware::security::SecurityHeadersLayer,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, Uri},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use synergy_shared::{
    auth::{gotrue::GoTrueClient, middleware::authenticate},
    email::EmailService,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. The pool
/// and both HTTP clients are reference counted internally.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Hosted auth service client
    pub gotrue: GoTrueClient,

    /// Outgoing email
    pub email: EmailService,
}

impl AppState {
    /// Creates new application state
    ///
    /// # Errors
    ///
    /// Fails when the auth service client cannot be built.
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let gotrue = GoTrueClient::new(&config.auth.supabase_url, &config.auth.anon_key)?;
        let email = EmailService::new(config.email_config());

        Ok(Self {
            db,
            config: Arc::new(config),
            gotrue,
            email,
        })
    }

    /// Gets the secret access tokens are validated with
    pub fn jwt_secret(&self) -> &str {
        &self.config.auth.jwt_secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /                          # Service banner (public)
/// ├── GET /health                    # Health check (public)
/// └── /api/v1/
///     ├── /auth/                     # signup, login, logout public; /me authenticated
///     ├── /projects/                 # projects and members (docs public)
///     ├── /tasks/
///     ├── /users/
///     ├── /notifications/
///     ├── /invitations/              # (docs public)
///     └── /dashboard/
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication (per-router basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_layer = || axum::middleware::from_fn_with_state(state.clone(), require_auth);

    // Public routes
    let public_auth_routes = Router::new()
        .route("/", get(routes::docs::auth_docs))
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout));

    let protected_auth_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .layer(auth_layer());

    let project_routes = Router::new()
        .route("/", get(routes::projects::list_projects).post(routes::projects::create_project))
        .route(
            "/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/:id/members",
            get(routes::members::list_members).post(routes::members::add_member),
        )
        .route(
            "/:id/members/:user_id",
            put(routes::members::update_member_role).delete(routes::members::remove_member),
        )
        .layer(auth_layer())
        .merge(Router::new().route("/docs", get(routes::docs::project_docs)));

    let task_routes = Router::new()
        .route("/", get(routes::tasks::list_my_tasks).post(routes::tasks::create_task))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/project/:project_id", get(routes::tasks::list_project_tasks))
        .layer(auth_layer());

    let user_routes = Router::new()
        .route(
            "/profile",
            get(routes::users::get_profile).put(routes::users::update_profile),
        )
        .route("/all", get(routes::users::list_users))
        .route("/search", get(routes::users::search_users))
        .route("/avatar", post(routes::users::update_avatar))
        .route("/:id", get(routes::users::get_user))
        .layer(auth_layer());

    let notification_routes = Router::new()
        .route("/", get(routes::notifications::list_notifications))
        .route("/unread-count", get(routes::notifications::unread_count))
        .route("/read-all", put(routes::notifications::mark_all_read))
        .route("/read", delete(routes::notifications::delete_read))
        .route("/:id/read", put(routes::notifications::mark_read))
        .route("/:id", delete(routes::notifications::delete_notification))
        .layer(auth_layer());

    let invitation_routes = Router::new()
        .route(
            "/projects/:project_id/invite",
            post(routes::invitations::send_invitation),
        )
        .route(
            "/projects/:project_id/invitations",
            get(routes::invitations::list_invitations),
        )
        .route(
            "/projects/:project_id/invitations/:invitation_id",
            delete(routes::invitations::cancel_invitation),
        )
        .route("/:token/accept", put(routes::invitations::accept_invitation))
        .route("/:token/decline", put(routes::invitations::decline_invitation))
        .layer(auth_layer())
        .merge(Router::new().route("/docs", get(routes::docs::invitation_docs)));

    let dashboard_routes = Router::new()
        .route("/", get(routes::dashboard::overview))
        .route("/stats", get(routes::dashboard::stats))
        .layer(auth_layer());

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(protected_auth_routes))
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/users", user_routes)
        .nest("/notifications", notification_routes)
        .nest("/invitations", invitation_routes)
        .nest("/dashboard", dashboard_routes);

    // Configure CORS based on environment
    let cors = if state.config.allows_any_origin() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", v1_routes)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.is_production()))
        .with_state(state)
}

/// Bearer token authentication
///
/// Validates the access token and injects the [`AuthUser`] into request
/// extensions.
///
/// [`AuthUser`]: synergy_shared::auth::middleware::AuthUser
async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let user = authenticate(req.headers(), state.jwt_secret()).map_err(|e| {
        tracing::debug!(error = %e, path = %req.uri().path(), "Rejected request");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("The endpoint {} {} does not exist", method, uri.path()))
}
