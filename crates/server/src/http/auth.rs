use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use db::models::user::User;
use url::form_urlencoded;

use crate::{error::ApiError, AppState};

fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let (prefix, rest) = trimmed.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn extract_query_token(req: &Request) -> Option<String> {
    let query = req.uri().query()?;
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key == "token" {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            return Some(trimmed.to_string());
        }
    }
    None
}

fn is_websocket_request(req: &Request) -> bool {
    req.headers()
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("websocket"))
}

fn extract_request_token(req: &Request) -> Option<String> {
    if let Some(value) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer)
    {
        return Some(value.to_string());
    }

    // Browsers cannot set headers on a WebSocket handshake, so those
    // connections carry the token as a query parameter instead.
    if is_websocket_request(req) {
        return extract_query_token(req);
    }

    None
}

/// Verifies the bearer token and loads the acting user into request
/// extensions. Tokens for since-deleted users are rejected the same way
/// as invalid ones.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_request_token(&request).ok_or(ApiError::Unauthorized)?;
    let claims = state
        .auth()
        .verify_token(&token)
        .map_err(|_| ApiError::Unauthorized)?;
    let user = User::find_by_id(&state.db().pool, claims.sub)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
