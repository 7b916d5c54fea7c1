use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Message, MessageSummary, NewMessage, Thread};
use crate::error::Result;

/// Trait for database persistence operations
///
/// Implementations provide raw storage only. Ownership checks live in
/// [`crate::ChatStore`], which is the only intended caller.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Create a new thread
    async fn insert_thread(&self, user_id: &str, title: &str) -> Result<Thread>;

    /// Get a thread by ID
    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>>;

    /// List threads for a user, most recent activity first
    async fn list_threads(
        &self,
        user_id: &str,
        limit: Option<i64>,
        skip: Option<i64>,
    ) -> Result<Vec<Thread>>;

    /// Case-insensitive title search within a user's threads
    async fn search_threads(&self, user_id: &str, query: &str, limit: i64) -> Result<Vec<Thread>>;

    async fn update_thread_title(&self, thread_id: &str, title: &str) -> Result<()>;

    /// Set the thread's last-activity timestamp
    async fn touch_thread(&self, thread_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Delete a thread together with its messages and summaries
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Insert a message; the backend assigns id and a strictly increasing creation time
    async fn insert_message(&self, thread_id: &str, message: NewMessage) -> Result<Message>;

    async fn get_message(&self, message_id: &str) -> Result<Option<Message>>;

    /// Get all messages for a thread in creation order
    async fn get_messages(&self, thread_id: &str) -> Result<Vec<Message>>;

    async fn count_messages(&self, thread_id: &str) -> Result<u64>;

    /// Delete one message and its summaries
    async fn delete_message(&self, message_id: &str) -> Result<()>;

    /// Delete every message of the thread created at or after `cutoff`, plus
    /// their summaries, in a single call. Returns the deleted message ids.
    async fn delete_messages_from(
        &self,
        thread_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<String>>;

    async fn insert_summary(
        &self,
        thread_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<MessageSummary>;

    /// Get all summaries for a thread in creation order
    async fn get_summaries(&self, thread_id: &str) -> Result<Vec<MessageSummary>>;

    /// Cheap connectivity probe
    async fn ping(&self) -> Result<()>;
}
