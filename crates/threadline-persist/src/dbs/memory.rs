use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::models::{Message, MessageSummary, NewMessage, Thread};
use crate::trait_client::PersistenceClient;

/// In-process backend. Every call takes the lock once, so multi-row deletes
/// are atomic.
#[derive(Default)]
pub struct MemoryPersistenceClient {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    threads: HashMap<String, Thread>,
    messages: HashMap<String, Message>,
    summaries: HashMap<String, MessageSummary>,
    last_tick: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Creation clock: wall time, nudged forward so no two rows share a timestamp
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_tick {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_tick = Some(ts);
        ts
    }

    fn remove_summaries_of(&mut self, message_ids: &[String]) {
        self.summaries
            .retain(|_, s| !message_ids.iter().any(|id| *id == s.message_id));
    }
}

impl MemoryPersistenceClient {
    pub fn new() -> Self {
        Self::default()
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl PersistenceClient for MemoryPersistenceClient {
    async fn insert_thread(&self, user_id: &str, title: &str) -> Result<Thread> {
        let mut state = self.state.write().await;
        let now = state.next_timestamp();
        let thread = Thread {
            id: new_id(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: now,
            last_message_at: now,
        };
        state.threads.insert(thread.id.clone(), thread.clone());
        Ok(thread)
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        Ok(self.state.read().await.threads.get(thread_id).cloned())
    }

    async fn list_threads(
        &self,
        user_id: &str,
        limit: Option<i64>,
        skip: Option<i64>,
    ) -> Result<Vec<Thread>> {
        let state = self.state.read().await;
        let mut threads: Vec<Thread> = state
            .threads
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        threads.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));

        let skip = skip.unwrap_or(0).max(0) as usize;
        let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(threads.into_iter().skip(skip).take(limit).collect())
    }

    async fn search_threads(&self, user_id: &str, query: &str, limit: i64) -> Result<Vec<Thread>> {
        let needle = query.to_lowercase();
        let state = self.state.read().await;
        let mut threads: Vec<Thread> = state
            .threads
            .values()
            .filter(|t| t.user_id == user_id && t.title.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        threads.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        threads.truncate(limit.max(0) as usize);
        Ok(threads)
    }

    async fn update_thread_title(&self, thread_id: &str, title: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let thread = state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;
        thread.title = title.to_string();
        Ok(())
    }

    async fn touch_thread(&self, thread_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        let thread = state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;
        thread.last_message_at = at;
        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.messages.retain(|_, m| m.thread_id != thread_id);
        state.summaries.retain(|_, s| s.thread_id != thread_id);
        state.threads.remove(thread_id);
        Ok(())
    }

    async fn insert_message(&self, thread_id: &str, message: NewMessage) -> Result<Message> {
        let mut state = self.state.write().await;
        if !state.threads.contains_key(thread_id) {
            return Err(PersistError::ThreadNotFound(thread_id.to_string()));
        }
        let created_at = state.next_timestamp();
        let message = Message {
            id: new_id(),
            thread_id: thread_id.to_string(),
            role: message.role,
            content: message.content,
            parts: message.parts,
            created_at,
        };
        state.messages.insert(message.id.clone(), message.clone());
        Ok(message)
    }

    async fn get_message(&self, message_id: &str) -> Result<Option<Message>> {
        Ok(self.state.read().await.messages.get(message_id).cloned())
    }

    async fn get_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let state = self.state.read().await;
        let mut messages: Vec<Message> = state
            .messages
            .values()
            .filter(|m| m.thread_id == thread_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn count_messages(&self, thread_id: &str) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.messages.values().filter(|m| m.thread_id == thread_id).count() as u64)
    }

    async fn delete_message(&self, message_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.messages.remove(message_id);
        state.remove_summaries_of(&[message_id.to_string()]);
        Ok(())
    }

    async fn delete_messages_from(
        &self,
        thread_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let mut state = self.state.write().await;
        let doomed: Vec<String> = state
            .messages
            .values()
            .filter(|m| m.thread_id == thread_id && m.created_at >= cutoff)
            .map(|m| m.id.clone())
            .collect();
        for id in &doomed {
            state.messages.remove(id);
        }
        state.remove_summaries_of(&doomed);
        Ok(doomed)
    }

    async fn insert_summary(
        &self,
        thread_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<MessageSummary> {
        let mut state = self.state.write().await;
        let created_at = state.next_timestamp();
        let summary = MessageSummary {
            id: new_id(),
            thread_id: thread_id.to_string(),
            message_id: message_id.to_string(),
            content: content.to_string(),
            created_at,
        };
        state.summaries.insert(summary.id.clone(), summary.clone());
        Ok(summary)
    }

    async fn get_summaries(&self, thread_id: &str) -> Result<Vec<MessageSummary>> {
        let state = self.state.read().await;
        let mut summaries: Vec<MessageSummary> = state
            .summaries
            .values()
            .filter(|s| s.thread_id == thread_id)
            .cloned()
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(summaries)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
