/// In-app notification endpoints
///
/// Every operation is scoped to the requester's own notifications; another
/// user's notification id behaves as missing.
///
/// # Endpoints
///
/// - `GET /api/v1/notifications?limit=20&offset=0&unread_only=false&type=`
/// - `GET /api/v1/notifications/unread-count`
/// - `PUT /api/v1/notifications/:id/read`
/// - `PUT /api/v1/notifications/read-all`
/// - `DELETE /api/v1/notifications/:id`
/// - `DELETE /api/v1/notifications/read`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery},
    response::{ApiResponse, Pagination},
};
use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use synergy_shared::{
    auth::middleware::AuthUser,
    models::notification::{Notification, NotificationFilter, NotificationType, NotificationView},
};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub unread_only: Option<bool>,

    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> ApiResult<NotificationFilter> {
        let kind = self
            .kind
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::parse::<NotificationType>)
            .transpose()?;

        Ok(NotificationFilter::new(
            self.limit,
            self.offset,
            self.unread_only.unwrap_or(false),
            kind,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct UpdatedCount {
    pub updated_count: u64,
}

#[derive(Debug, Serialize)]
pub struct DeletedCount {
    pub deleted_count: u64,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Notification not found".to_string())
}

/// Newest first. `pagination.total` is the size of the returned page.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<ApiResponse<Vec<NotificationView>>> {
    let filter = query.into_filter()?;
    let notifications = Notification::list(&state.db, user.id, filter).await?;

    let pagination = Pagination {
        limit: filter.limit,
        offset: filter.offset,
        total: notifications.len() as i64,
    };

    Ok(ApiResponse::paginated(notifications, pagination))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<ApiResponse<UnreadCount>> {
    let unread_count = Notification::unread_count(&state.db, user.id).await?;
    Ok(ApiResponse::data(UnreadCount { unread_count }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Notification>> {
    let notification = Notification::mark_read(&state.db, id, user.id)
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::with_message("Notification marked as read", notification))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<ApiResponse<UpdatedCount>> {
    let updated_count = Notification::mark_all_read(&state.db, user.id).await?;

    tracing::debug!(user_id = %user.id, updated_count, "Notifications marked as read");

    Ok(ApiResponse::with_message(
        "All notifications marked as read",
        UpdatedCount { updated_count },
    ))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    if !Notification::delete(&state.db, id, user.id).await? {
        return Err(not_found());
    }

    Ok(ApiResponse::message("Notification deleted successfully"))
}

pub async fn delete_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<ApiResponse<DeletedCount>> {
    let deleted_count = Notification::delete_read(&state.db, user.id).await?;

    Ok(ApiResponse::with_message(
        "Read notifications deleted successfully",
        DeletedCount { deleted_count },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use synergy_shared::models::notification::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

    #[test]
    fn test_default_filter() {
        let filter = ListQuery::default().into_filter().unwrap();
        assert_eq!(filter.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(filter.offset, 0);
        assert!(!filter.unread_only);
        assert!(filter.kind.is_none());
    }

    #[test]
    fn test_filter_clamps_and_parses_type() {
        let filter = ListQuery {
            limit: Some(1000),
            offset: Some(-5),
            unread_only: Some(true),
            kind: Some("task_assigned".to_string()),
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter.limit, MAX_PAGE_SIZE);
        assert_eq!(filter.offset, 0);
        assert!(filter.unread_only);
        assert_eq!(filter.kind, Some(NotificationType::TaskAssigned));
    }

    #[test]
    fn test_unknown_type_is_bad_request() {
        let result = ListQuery {
            kind: Some("deadline_reminder".to_string()),
            ..Default::default()
        }
        .into_filter();

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
