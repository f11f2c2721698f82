use axum::{
    extract::{Path, State},
    routing::{get, put},
    Extension, Json, Router,
};
use db::models::{
    activity::ActivityEntry,
    notification::{Notification, NotificationError},
    user::User,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{error::ApiError, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", put(mark_read))
        .route("/notifications/read-all", put(mark_all_read))
        .route("/notifications/activity/{project_id}", get(project_activity))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InboxResponse {
    notifications: Vec<Notification>,
    unread_count: u64,
}

async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<InboxResponse>, ApiError> {
    let notifications = Notification::list_for_user(&state.db().pool, user.id).await?;
    let unread_count = Notification::unread_count(&state.db().pool, user.id).await?;
    Ok(Json(InboxResponse {
        notifications,
        unread_count,
    }))
}

/// Owner-scoped: an id belonging to another user is indistinguishable
/// from a missing one, and neither is an error here.
async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    match Notification::mark_read(&state.db().pool, id, user.id).await {
        Ok(()) | Err(NotificationError::NotFound) => {
            Ok(Json(json!({ "message": "Notification marked as read" })))
        }
        Err(err) => Err(err.into()),
    }
}

async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, ApiError> {
    Notification::mark_all_read(&state.db().pool, user.id).await?;
    Ok(Json(json!({ "message": "All notifications marked as read" })))
}

async fn project_activity(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
    let entries = ActivityEntry::find_by_project(&state.db().pool, project_id).await?;
    Ok(Json(entries))
}
