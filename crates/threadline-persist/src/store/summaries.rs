use crate::error::Result;
use crate::guard::{check_thread_ownership, Identity};
use crate::models::MessageSummary;

use super::ChatStore;

impl ChatStore {
    pub async fn list_summaries(
        &self,
        caller: Option<&Identity>,
        thread_id: &str,
    ) -> Result<Vec<MessageSummary>> {
        check_thread_ownership(self.backend(), caller, thread_id).await?;
        self.backend.get_summaries(thread_id).await
    }

    /// Attach a summary to a message of an owned thread
    pub async fn create_summary(
        &self,
        caller: Option<&Identity>,
        thread_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<MessageSummary> {
        check_thread_ownership(self.backend(), caller, thread_id).await?;
        self.message_in_thread(thread_id, message_id).await?;
        self.backend.insert_summary(thread_id, message_id, content).await
    }
}
