/// Per-connection state for one authenticated chat socket. Room membership
/// lives in the broker, keyed by `conn_id`.
pub struct Session {
    pub user_id: i64,
    pub conn_id: u64,
}

impl Session {
    pub fn new(user_id: i64, conn_id: u64) -> Self {
        Self { user_id, conn_id }
    }
}
