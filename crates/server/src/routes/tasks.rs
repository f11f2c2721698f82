use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{post, put},
    Extension, Json, Router,
};
use db::models::{
    board::Board,
    comment::{Comment, CreateComment},
    project::Project,
    task::{CreateTask, GroupedTasks, Task, UpdateTask},
    user::User,
};
use serde_json::{json, Value};
use services::services::{
    notify::{self, TaskMutation},
    rooms::ProjectEvent,
};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::model_loaders::{load_project_middleware, load_task_middleware},
    AppState,
};

pub fn router(state: &AppState) -> Router<AppState> {
    let project_scoped = Router::new()
        .route(
            "/projects/{project_id}/tasks",
            post(create_task).get(list_tasks),
        )
        .layer(from_fn_with_state(
            state.clone(),
            load_project_middleware,
        ));

    let task_scoped = Router::new()
        .route(
            "/tasks/{task_id}",
            put(update_task).delete(delete_task),
        )
        .route(
            "/tasks/{task_id}/comments",
            post(create_comment).get(list_comments),
        )
        .layer(from_fn_with_state(state.clone(), load_task_middleware));

    Router::new().merge(project_scoped).merge(task_scoped)
}

async fn ensure_member(state: &AppState, project_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
    if !Project::is_member(&state.db().pool, project_id, user_id).await? {
        return Err(ApiError::Forbidden(
            "Not a member of this project".to_string(),
        ));
    }
    Ok(())
}

async fn create_task(
    State(state): State<AppState>,
    Extension(project): Extension<Project>,
    Extension(actor): Extension<User>,
    Json(payload): Json<CreateTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    ensure_member(&state, project.id, actor.id).await?;

    let board = Board::find_or_create(&state.db().pool, project.id).await?;
    let task = Task::create(
        &state.db().pool,
        &payload,
        project.id,
        board.id,
        actor.id,
        Uuid::new_v4(),
    )
    .await?;

    let derived = notify::derive(&actor, &TaskMutation::Created { task: task.clone() });
    notify::record(&state.db().pool, &derived).await;
    state
        .rooms()
        .broadcast(project.id, &ProjectEvent::TaskCreated(task.clone()))
        .await;

    Ok((StatusCode::CREATED, Json(task)))
}

async fn list_tasks(
    State(state): State<AppState>,
    Extension(project): Extension<Project>,
    Extension(actor): Extension<User>,
) -> Result<Json<GroupedTasks>, ApiError> {
    ensure_member(&state, project.id, actor.id).await?;
    let grouped = Task::find_by_project_grouped(&state.db().pool, project.id).await?;
    Ok(Json(grouped))
}

async fn update_task(
    State(state): State<AppState>,
    Extension(before): Extension<Task>,
    Extension(actor): Extension<User>,
    Json(payload): Json<UpdateTask>,
) -> Result<Json<Task>, ApiError> {
    ensure_member(&state, before.project_id, actor.id).await?;

    let task = Task::update(&state.db().pool, before.id, &payload).await?;

    let derived = notify::derive(
        &actor,
        &TaskMutation::Updated {
            before,
            after: task.clone(),
            update: payload,
        },
    );
    notify::record(&state.db().pool, &derived).await;
    state
        .rooms()
        .broadcast(task.project_id, &ProjectEvent::TaskUpdated(task.clone()))
        .await;

    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    Extension(task): Extension<Task>,
    Extension(actor): Extension<User>,
) -> Result<Json<Value>, ApiError> {
    ensure_member(&state, task.project_id, actor.id).await?;

    Task::delete(&state.db().pool, task.id).await?;

    let derived = notify::derive(&actor, &TaskMutation::Deleted { task: task.clone() });
    notify::record(&state.db().pool, &derived).await;
    state
        .rooms()
        .broadcast(
            task.project_id,
            &ProjectEvent::TaskDeleted { task_id: task.id },
        )
        .await;

    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

async fn create_comment(
    State(state): State<AppState>,
    Extension(task): Extension<Task>,
    Extension(actor): Extension<User>,
    Json(payload): Json<CreateComment>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    ensure_member(&state, task.project_id, actor.id).await?;

    let comment = Comment::create(
        &state.db().pool,
        &payload,
        task.id,
        actor.id,
        Uuid::new_v4(),
    )
    .await?;

    let derived = notify::derive(
        &actor,
        &TaskMutation::Commented {
            task: task.clone(),
            comment: comment.clone(),
        },
    );
    notify::record(&state.db().pool, &derived).await;
    state
        .rooms()
        .broadcast(
            task.project_id,
            &ProjectEvent::CommentAdded {
                task_id: task.id,
                comment: comment.clone(),
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(comment)))
}

async fn list_comments(
    State(state): State<AppState>,
    Extension(task): Extension<Task>,
    Extension(actor): Extension<User>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    ensure_member(&state, task.project_id, actor.id).await?;
    let comments = Comment::find_by_task(&state.db().pool, task.id).await?;
    Ok(Json(comments))
}
