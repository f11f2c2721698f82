pub mod activity_entry;
pub mod board;
pub mod comment;
pub mod notification;
pub mod project;
pub mod project_member;
pub mod task;
pub mod user;
