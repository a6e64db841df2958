/// API route handlers
///
/// Organized by resource:
///
/// - `health`: service banner and health check
/// - `docs`: endpoint documentation
/// - `auth`: sign-up, login, logout, current user
/// - `projects` / `members`: projects and their memberships
/// - `tasks`: tasks
/// - `users`: profiles and user lookup
/// - `notifications`: in-app notifications
/// - `invitations`: email invitations into a project
/// - `dashboard`: per-user overview and statistics

pub mod auth;
pub mod dashboard;
pub mod docs;
pub mod health;
pub mod invitations;
pub mod members;
pub mod notifications;
pub mod projects;
pub mod tasks;
pub mod users;
pub mod validation;

use sqlx::PgPool;
use synergy_shared::{auth::middleware::AuthUser, models::profile::Profile};

/// Name shown to other users in notifications and emails.
///
/// Falls back to the token metadata, then the email address. A lookup
/// failure only degrades the name.
pub(crate) async fn requester_name(pool: &PgPool, user: &AuthUser) -> String {
    let stored = match Profile::find_by_id(pool, user.id).await {
        Ok(profile) => profile.map(|p| p.name().display_name()),
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user.id, "Profile lookup failed");
            None
        }
    };

    stored
        .filter(|name| !name.is_empty())
        .or_else(|| {
            let from_metadata = [user.metadata_str("first_name"), user.metadata_str("last_name")]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            Some(from_metadata).filter(|name| !name.trim().is_empty())
        })
        .or_else(|| user.email.clone())
        .unwrap_or_else(|| "A teammate".to_string())
}
