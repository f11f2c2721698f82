use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{routes, AppState};

pub mod auth;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .merge(routes::projects::router(&state))
        .merge(routes::tasks::router(&state))
        .merge(routes::users::router())
        .merge(routes::notifications::router())
        .route("/ws", get(routes::ws::ws_handler))
        .layer(from_fn_with_state(state.clone(), auth::require_auth));

    let api = Router::new().merge(routes::auth::router()).merge(protected);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use db::DBService;
    use serde_json::{json, Value};
    use services::services::{auth::AuthService, rooms::RoomRegistry};
    use tower::ServiceExt;

    use crate::AppState;

    async fn setup_app() -> Router {
        let db = DBService::new_in_memory().await.unwrap();
        let state = AppState::new(db, AuthService::with_secret("test-secret"), RoomRegistry::new());
        super::router(state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_with_token(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn register(app: &Router, username: &str) -> (String, Value) {
        let (status, body) = send(
            app,
            post_json(
                "/api/auth/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "hunter2",
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"].clone(),
        )
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = setup_app().await;
        let (status, _) = send(
            &app,
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn api_rejects_missing_or_bad_token() {
        let app = setup_app().await;
        let (status, _) = send(
            &app,
            Request::builder()
                .uri("/api/projects")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, get_with_token("/api/projects", "garbage")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_login_me_flow() {
        let app = setup_app().await;
        let (token, user) = register(&app, "alice").await;
        assert_eq!(user["username"], "alice");

        let (status, body) = send(
            &app,
            post_json(
                "/api/auth/register",
                None,
                json!({
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": "hunter2",
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "User already exists");

        let (status, body) = send(
            &app,
            post_json(
                "/api/auth/login",
                None,
                json!({ "email": "alice@example.com", "password": "wrong" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid credentials");

        let (status, body) = send(
            &app,
            post_json(
                "/api/auth/login",
                None,
                json!({ "email": "alice@example.com", "password": "hunter2" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());

        let (status, body) = send(&app, get_with_token("/api/auth/me", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
    }

    #[tokio::test]
    async fn task_lifecycle_over_http() {
        let app = setup_app().await;
        let (owner_token, _) = register(&app, "owner").await;
        let (member_token, member) = register(&app, "member").await;
        let member_id = member["id"].as_str().unwrap().to_string();

        let (status, project) = send(
            &app,
            post_json(
                "/api/projects",
                Some(&owner_token),
                json!({ "name": "Acme", "description": "demo" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let project_id = project["id"].as_str().unwrap().to_string();

        // Outsiders cannot touch project-scoped routes.
        let (status, _) = send(
            &app,
            post_json(
                &format!("/api/projects/{project_id}/tasks"),
                Some(&member_token),
                json!({ "title": "nope" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, added) = send(
            &app,
            post_json(
                &format!("/api/projects/{project_id}/members"),
                Some(&owner_token),
                json!({ "userId": member_id }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(added["role"], "member");

        let (status, task) = send(
            &app,
            post_json(
                &format!("/api/projects/{project_id}/tasks"),
                Some(&owner_token),
                json!({ "title": "Fix bug", "priority": "high", "assigned_to": member_id }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(task["status"], "todo");
        assert_eq!(task["created_by_username"], "owner");
        assert_eq!(task["assigned_to_username"], "member");
        let task_id = task["id"].as_str().unwrap().to_string();

        // member_added from the invite, then task_assigned.
        let (status, inbox) = send(&app, get_with_token("/api/notifications", &member_token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(inbox["unreadCount"], 2);
        assert_eq!(inbox["notifications"][0]["type"], "task_assigned");

        let (status, grouped) = send(
            &app,
            get_with_token(&format!("/api/projects/{project_id}/tasks"), &member_token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(grouped["todo"].as_array().unwrap().len(), 1);

        let mut update = Request::builder()
            .method("PUT")
            .uri(format!("/api/tasks/{task_id}"))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {member_token}"))
            .body(Body::from(json!({ "status": "done" }).to_string()))
            .unwrap();
        let (status, updated) = send(&app, update).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "done");

        update = Request::builder()
            .method("PUT")
            .uri(format!("/api/tasks/{task_id}"))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {member_token}"))
            .body(Body::from(json!({}).to_string()))
            .unwrap();
        let (status, body) = send(&app, update).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No fields to update");

        let (status, comment) = send(
            &app,
            post_json(
                &format!("/api/tasks/{task_id}/comments"),
                Some(&member_token),
                json!({ "content": "on it" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["username"], "member");

        let (status, activity) = send(
            &app,
            get_with_token(
                &format!("/api/notifications/activity/{project_id}"),
                &owner_token,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let actions: Vec<&str> = activity
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["action"].as_str().unwrap())
            .collect();
        assert_eq!(actions, vec!["added_comment", "updated_task", "created_task", "added_member"]);

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/api/tasks/{task_id}"))
            .header(header::AUTHORIZATION, format!("Bearer {owner_token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, delete).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Task deleted successfully");

        let (status, _) = send(
            &app,
            get_with_token(&format!("/api/tasks/{task_id}/comments"), &owner_token),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
