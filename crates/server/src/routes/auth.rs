use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use db::models::user::{CreateUser, User, UserError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let username = payload.username.trim();
    let email = payload.email.trim();
    if username.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username, email and password are required".to_string(),
        ));
    }

    if User::find_by_username_or_email(&state.db().pool, username, email)
        .await?
        .is_some()
    {
        return Err(ApiError::User(UserError::AlreadyExists));
    }

    let password_hash = state.auth().hash_password(&payload.password)?;
    let user = User::create(
        &state.db().pool,
        &CreateUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            name: payload.name.clone(),
        },
        Uuid::new_v4(),
    )
    .await?;

    let token = state.auth().issue_token(&user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let invalid = || ApiError::BadRequest("Invalid credentials".to_string());

    let (user, hash) = User::find_by_email_with_password(&state.db().pool, payload.email.trim())
        .await?
        .ok_or_else(invalid)?;
    if !state.auth().verify_password(&payload.password, &hash)? {
        return Err(invalid());
    }

    let token = state.auth().issue_token(&user)?;
    Ok(Json(AuthResponse { token, user }))
}

pub async fn me(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}
