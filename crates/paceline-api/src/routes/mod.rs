pub mod auth;
pub mod conversations;
pub mod files;
pub mod messages;
