//! Fire-and-forget notification delivery.
//!
//! Handlers call these after their main write has succeeded. The insert runs
//! on a spawned task; a failure is logged and never reaches the client.

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::notification::{NewNotification, Notification};

/// Inserts one notification in the background.
pub fn notify(pool: &PgPool, notification: NewNotification) -> JoinHandle<()> {
    let pool = pool.clone();

    tokio::spawn(async move {
        let user_id = notification.user_id;
        let kind = notification.kind;

        match Notification::create(&pool, notification).await {
            Ok(created) => debug!(notification_id = %created.id, %user_id, kind = kind.as_str(), "Notification created"),
            Err(e) => warn!(error = %e, %user_id, kind = kind.as_str(), "Failed to create notification"),
        }
    })
}

/// Inserts a batch in one statement in the background. An empty batch is a no-op.
pub fn notify_many(pool: &PgPool, batch: Vec<NewNotification>) -> Option<JoinHandle<()>> {
    if batch.is_empty() {
        return None;
    }

    let pool = pool.clone();

    Some(tokio::spawn(async move {
        let count = batch.len();

        match Notification::create_many(&pool, batch).await {
            Ok(inserted) => debug!(inserted, "Notifications created"),
            Err(e) => warn!(error = %e, count, "Failed to create notifications"),
        }
    }))
}
