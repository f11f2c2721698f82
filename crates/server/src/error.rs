use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use db::{
    models::{
        comment::CommentError, notification::NotificationError, project::ProjectError,
        task::TaskError, user::UserError,
    },
    DatabaseError,
};
use serde_json::json;
use services::services::auth::AuthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Comment(#[from] CommentError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Task(err) => match err {
                TaskError::NotFound => StatusCode::NOT_FOUND,
                TaskError::EmptyTitle | TaskError::NoFieldsToUpdate => StatusCode::BAD_REQUEST,
                TaskError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Project(err) => match err {
                ProjectError::NotFound => StatusCode::NOT_FOUND,
                ProjectError::NotAMember => StatusCode::FORBIDDEN,
                ProjectError::AlreadyMember => StatusCode::BAD_REQUEST,
                ProjectError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Comment(err) => match err {
                CommentError::EmptyContent => StatusCode::BAD_REQUEST,
                CommentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Notification(err) => match err {
                NotificationError::NotFound => StatusCode::NOT_FOUND,
                NotificationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::User(err) => match err {
                UserError::NotFound => StatusCode::NOT_FOUND,
                UserError::AlreadyExists => StatusCode::BAD_REQUEST,
                UserError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Auth(AuthError::Hash(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(AuthError::Token(_)) | ApiError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error on request: {self}");
            "Server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
