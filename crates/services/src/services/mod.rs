pub mod auth;
pub mod notify;
pub mod rooms;
