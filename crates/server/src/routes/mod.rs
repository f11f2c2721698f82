pub mod auth;
pub mod health;
pub mod notifications;
pub mod projects;
pub mod tasks;
pub mod users;
pub mod ws;
