pub mod activity;
pub mod board;
pub mod comment;
pub mod notification;
pub mod project;
pub mod task;
pub mod user;
