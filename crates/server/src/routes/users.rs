use axum::{extract::State, routing::get, Extension, Json, Router};
use db::models::user::User;

use crate::{error::ApiError, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/users", get(list_users))
}

/// Everyone except the caller, for member pickers.
async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = User::find_all_except(&state.db().pool, user.id).await?;
    Ok(Json(users))
}
