/// Authentication and authorization
///
/// # Modules
///
/// - [`gotrue`]: client for the hosted auth service (sign-up, sign-in, sign-out)
/// - [`jwt`]: local validation of the auth service's access tokens
/// - [`middleware`]: bearer-token extraction producing [`middleware::AuthUser`]
/// - [`authorization`]: project membership and manager checks
/// - [`invitation_token`]: random invitation tokens and their stored hashes
///
/// # Example
///
/// ```no_run
/// use synergy_shared::auth::jwt::validate_access_token;
/// use synergy_shared::auth::authorization::require_member;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, token: &str, project_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let claims = validate_access_token(token, "jwt-secret-with-at-least-32-characters")?;
/// require_member(&pool, project_id, claims.sub, "Access denied to this project").await?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod gotrue;
pub mod invitation_token;
pub mod jwt;
pub mod middleware;
