use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Conversation container owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Last-activity timestamp, bumped whenever a message is added
    pub last_message_at: DateTime<Utc>,
}
