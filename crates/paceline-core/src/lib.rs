pub mod auth;
pub mod conversation;
pub mod error;
pub mod events;
pub mod message;
pub mod rooms;
pub mod unread;

use paceline_db::DbPool;
use paceline_media::StorageManager;
use std::sync::Arc;
use tokio::sync::Notify;

/// Bit flag: user is a platform-wide admin.
pub const USER_FLAG_ADMIN: i32 = 1 << 0;
/// Bit flag: user is a coach account.
pub const USER_FLAG_COACH: i32 = 1 << 1;

pub fn is_admin(flags: i32) -> bool {
    flags & USER_FLAG_ADMIN != 0
}

pub fn is_coach(flags: i32) -> bool {
    flags & USER_FLAG_COACH != 0
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub rooms: Arc<rooms::RoomBroker>,
    pub storage: Arc<StorageManager>,
    pub config: AppConfig,
    pub shutdown: Arc<Notify>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub registration_enabled: bool,
    pub storage_path: String,
    pub max_upload_size: u64,
    pub database_url: String,
    /// The public URL of this server (e.g., https://app.example.com).
    /// Used for CORS configuration.
    pub public_url: Option<String>,
    /// Worker id mixed into generated snowflakes; distinguishes instances
    /// sharing a postgres database.
    pub worker_id: u16,
}

impl AppConfig {
    pub fn next_id(&self) -> i64 {
        paceline_util::snowflake::generate(self.worker_id)
    }
}
