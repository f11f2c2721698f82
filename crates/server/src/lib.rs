use db::DBService;
use services::services::{auth::AuthService, rooms::RoomRegistry};

pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;

/// Shared handler state: the database pool, the token service and the
/// room registry. The registry is an explicit dependency here rather than
/// a process-global so the broadcast path is always injected.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    auth: AuthService,
    rooms: RoomRegistry,
}

impl AppState {
    pub fn new(db: DBService, auth: AuthService, rooms: RoomRegistry) -> Self {
        Self { db, auth, rooms }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }
}
