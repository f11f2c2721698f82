use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use db::{
    models::{
        project::{CreateProject, Project, ProjectMember, ProjectWithMembers},
        user::User,
    },
    TransactionTrait,
};
use serde::Deserialize;
use services::services::notify;
use uuid::Uuid;

use crate::{error::ApiError, middleware::model_loaders::load_project_middleware, AppState};

pub fn router(state: &AppState) -> Router<AppState> {
    let project_scoped = Router::new()
        .route("/projects/{id}", get(get_project))
        .route("/projects/{id}/members", post(add_member))
        .layer(from_fn_with_state(
            state.clone(),
            load_project_middleware,
        ));

    Router::new()
        .route("/projects", post(create_project).get(list_projects))
        .merge(project_scoped)
}

async fn create_project(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateProject>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Project name is required".to_string()));
    }

    // Project row and owner membership commit together.
    let txn = state.db().pool.begin().await?;
    let project = Project::create(&txn, &payload, user.id, Uuid::new_v4()).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(project)))
}

async fn list_projects(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let projects = Project::find_for_member(&state.db().pool, user.id).await?;
    Ok(Json(projects))
}

async fn get_project(
    State(state): State<AppState>,
    Extension(project): Extension<Project>,
) -> Result<Json<ProjectWithMembers>, ApiError> {
    let members = Project::members(&state.db().pool, project.id).await?;
    Ok(Json(ProjectWithMembers { project, members }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddMemberRequest {
    user_id: Uuid,
}

async fn add_member(
    State(state): State<AppState>,
    Extension(project): Extension<Project>,
    Extension(actor): Extension<User>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<Json<ProjectMember>, ApiError> {
    if !Project::is_member(&state.db().pool, project.id, actor.id).await? {
        return Err(ApiError::Forbidden(
            "Not authorized or project not found".to_string(),
        ));
    }

    let user = User::find_by_id(&state.db().pool, payload.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let member = Project::add_member(&state.db().pool, project.id, &user).await?;

    let derived = notify::derive_member_added(&actor, &project, user.id, &user.username);
    notify::record(&state.db().pool, &derived).await;

    Ok(Json(member))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_member_payload_uses_camel_case() {
        let id = Uuid::new_v4();
        let payload: AddMemberRequest =
            serde_json::from_value(serde_json::json!({ "userId": id })).unwrap();
        assert_eq!(payload.user_id, id);
    }
}
