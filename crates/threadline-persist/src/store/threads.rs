use crate::error::Result;
use crate::guard::{check_thread_ownership, require_identity, Identity};
use crate::models::Thread;

use super::{ChatStore, DEFAULT_THREAD_TITLE};

impl ChatStore {
    /// Caller's threads by last activity, newest first. Anonymous callers get
    /// an empty list rather than an error.
    pub async fn list_threads(
        &self,
        caller: Option<&Identity>,
        limit: Option<i64>,
        skip: Option<i64>,
    ) -> Result<Vec<Thread>> {
        let Some(identity) = caller else {
            return Ok(Vec::new());
        };
        self.backend.list_threads(&identity.subject, limit, skip).await
    }

    pub async fn search_threads(
        &self,
        caller: Option<&Identity>,
        query: &str,
        limit: i64,
    ) -> Result<Vec<Thread>> {
        let Some(identity) = caller else {
            return Ok(Vec::new());
        };
        self.backend.search_threads(&identity.subject, query, limit).await
    }

    pub async fn create_thread(
        &self,
        caller: Option<&Identity>,
        title: Option<String>,
    ) -> Result<Thread> {
        let identity = require_identity(caller)?;
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_THREAD_TITLE.to_string());

        let thread = self.backend.insert_thread(&identity.subject, &title).await?;
        tracing::info!(thread_id = %thread.id, subject = %identity.subject, "Thread created");
        Ok(thread)
    }

    pub async fn get_thread(&self, caller: Option<&Identity>, thread_id: &str) -> Result<Thread> {
        check_thread_ownership(self.backend(), caller, thread_id).await
    }

    pub async fn update_title(
        &self,
        caller: Option<&Identity>,
        thread_id: &str,
        title: &str,
    ) -> Result<Thread> {
        let mut thread = check_thread_ownership(self.backend(), caller, thread_id).await?;
        self.backend.update_thread_title(thread_id, title).await?;
        thread.title = title.to_string();
        Ok(thread)
    }

    /// Delete a thread with its messages and summaries
    pub async fn delete_thread(&self, caller: Option<&Identity>, thread_id: &str) -> Result<()> {
        check_thread_ownership(self.backend(), caller, thread_id).await?;
        self.backend.delete_thread(thread_id).await?;
        tracing::info!(thread_id, "Thread deleted");
        Ok(())
    }

    /// Delete every thread of the caller; returns how many were removed
    pub async fn delete_all_threads(&self, caller: Option<&Identity>) -> Result<usize> {
        let identity = require_identity(caller)?;
        let threads = self.backend.list_threads(&identity.subject, None, None).await?;

        for thread in &threads {
            self.backend.delete_thread(&thread.id).await?;
        }

        tracing::info!(subject = %identity.subject, count = threads.len(), "Deleted all threads");
        Ok(threads.len())
    }
}
