use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Short label derived from a message, used for navigation and titles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: String,
    pub thread_id: String,
    pub message_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
