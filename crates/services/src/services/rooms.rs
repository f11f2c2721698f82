use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use db::models::{comment::Comment, task::Task};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Event published to every live subscriber of a project room.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ProjectEvent {
    TaskCreated(Task),
    TaskUpdated(Task),
    #[serde(rename_all = "camelCase")]
    TaskDeleted { task_id: Uuid },
    #[serde(rename_all = "camelCase")]
    CommentAdded { task_id: Uuid, comment: Comment },
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<Uuid, mpsc::UnboundedSender<String>>,
    rooms: HashMap<Uuid, HashSet<Uuid>>,
    subscriptions: HashMap<Uuid, HashSet<Uuid>>,
}

/// Process-local map from project to the set of live connections watching
/// it. Mutated only by connection lifecycle events; read by broadcast.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live connection and returns its id. The sender carries
    /// serialized event frames to the connection's writer task.
    pub async fn register(&self, sender: mpsc::UnboundedSender<String>) -> Uuid {
        let connection_id = Uuid::new_v4();
        let mut state = self.state.write().await;
        state.connections.insert(connection_id, sender);
        state.subscriptions.insert(connection_id, HashSet::new());
        connection_id
    }

    /// Idempotent; joining a room twice is the same as joining once.
    pub async fn join(&self, connection_id: Uuid, project_id: Uuid) {
        let mut state = self.state.write().await;
        if !state.connections.contains_key(&connection_id) {
            return;
        }
        state.rooms.entry(project_id).or_default().insert(connection_id);
        if let Some(subs) = state.subscriptions.get_mut(&connection_id) {
            subs.insert(project_id);
        }
    }

    /// No-op if the connection is not subscribed to the room.
    pub async fn leave(&self, connection_id: Uuid, project_id: Uuid) {
        let mut state = self.state.write().await;
        if let Some(room) = state.rooms.get_mut(&project_id) {
            room.remove(&connection_id);
            if room.is_empty() {
                state.rooms.remove(&project_id);
            }
        }
        if let Some(subs) = state.subscriptions.get_mut(&connection_id) {
            subs.remove(&project_id);
        }
    }

    /// Removes the connection from every room it joined. Runs on any
    /// termination, normal or not.
    pub async fn disconnect(&self, connection_id: Uuid) {
        let mut state = self.state.write().await;
        state.connections.remove(&connection_id);
        if let Some(subs) = state.subscriptions.remove(&connection_id) {
            for project_id in subs {
                if let Some(room) = state.rooms.get_mut(&project_id) {
                    room.remove(&connection_id);
                    if room.is_empty() {
                        state.rooms.remove(&project_id);
                    }
                }
            }
        }
    }

    /// Best-effort fanout to the room's current subscribers. A closed
    /// subscriber channel is skipped; it never aborts delivery to others.
    pub async fn broadcast(&self, project_id: Uuid, event: &ProjectEvent) {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%project_id, "failed to serialize room event: {err}");
                return;
            }
        };

        let state = self.state.read().await;
        let Some(room) = state.rooms.get(&project_id) else {
            return;
        };
        for connection_id in room {
            if let Some(sender) = state.connections.get(connection_id) {
                let _ = sender.send(frame.clone());
            }
        }
    }
}
