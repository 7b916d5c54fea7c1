use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{PersistError, Result};
use crate::guard::{check_thread_ownership, Identity};
use crate::models::{Message, NewMessage};

use super::ChatStore;

/// Outcome of a trailing deletion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailingDeletion {
    /// Creation time of the cut-point message
    pub cutoff: DateTime<Utc>,
    pub deleted: Vec<String>,
}

impl ChatStore {
    /// Messages of an owned thread in creation order
    pub async fn list_messages(
        &self,
        caller: Option<&Identity>,
        thread_id: &str,
    ) -> Result<Vec<Message>> {
        check_thread_ownership(self.backend(), caller, thread_id).await?;
        self.backend.get_messages(thread_id).await
    }

    /// Append a message and bump the thread's last-activity timestamp
    pub async fn send_message(
        &self,
        caller: Option<&Identity>,
        thread_id: &str,
        message: NewMessage,
    ) -> Result<Message> {
        check_thread_ownership(self.backend(), caller, thread_id).await?;

        let message = self.backend.insert_message(thread_id, message).await?;
        let touched_at = Utc::now().max(message.created_at);
        self.backend.touch_thread(thread_id, touched_at).await?;

        tracing::debug!(
            thread_id,
            message_id = %message.id,
            role = message.role.as_str(),
            "Message stored"
        );
        Ok(message)
    }

    /// Fetch one message, which must belong to the owned thread
    pub async fn get_message(
        &self,
        caller: Option<&Identity>,
        thread_id: &str,
        message_id: &str,
    ) -> Result<Message> {
        check_thread_ownership(self.backend(), caller, thread_id).await?;
        self.message_in_thread(thread_id, message_id).await
    }

    pub async fn delete_message(
        &self,
        caller: Option<&Identity>,
        thread_id: &str,
        message_id: &str,
    ) -> Result<()> {
        check_thread_ownership(self.backend(), caller, thread_id).await?;
        self.message_in_thread(thread_id, message_id).await?;
        self.backend.delete_message(message_id).await
    }

    /// Delete the cut-point message and everything created at or after it.
    ///
    /// The backend performs the removal in one call; see
    /// [`crate::PersistenceClient::delete_messages_from`].
    pub async fn delete_trailing(
        &self,
        caller: Option<&Identity>,
        thread_id: &str,
        message_id: &str,
    ) -> Result<TrailingDeletion> {
        check_thread_ownership(self.backend(), caller, thread_id).await?;
        let cut_point = self.message_in_thread(thread_id, message_id).await?;

        let deleted = self
            .backend
            .delete_messages_from(thread_id, cut_point.created_at)
            .await?;

        tracing::info!(thread_id, message_id, deleted = deleted.len(), "Trailing messages deleted");
        Ok(TrailingDeletion {
            cutoff: cut_point.created_at,
            deleted,
        })
    }

    pub(crate) async fn message_in_thread(&self, thread_id: &str, message_id: &str) -> Result<Message> {
        match self.backend.get_message(message_id).await? {
            Some(message) if message.thread_id == thread_id => Ok(message),
            _ => Err(PersistError::MessageNotFound(message_id.to_string())),
        }
    }
}
