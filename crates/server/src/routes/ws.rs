use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    Extension,
};
use db::models::user::User;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
enum ClientMessage {
    JoinProject(Uuid),
    LeaveProject(Uuid),
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: User) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let connection_id = state.rooms().register(tx).await;
    tracing::debug!(username = %user.username, %connection_id, "websocket connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            frame = rx.recv() => {
                match frame {
                    Some(frame) => {
                        if sender.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::JoinProject(project_id)) => {
                                state.rooms().join(connection_id, project_id).await;
                            }
                            Ok(ClientMessage::LeaveProject(project_id)) => {
                                state.rooms().leave(connection_id, project_id).await;
                            }
                            Err(err) => {
                                tracing::debug!("ignoring malformed client message: {err}");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    // Runs on any exit path so rooms never hold dead connections.
    state.rooms().disconnect(connection_id).await;
    let _ = sender.close().await;
    tracing::debug!(username = %user.username, %connection_id, "websocket disconnected");
}
