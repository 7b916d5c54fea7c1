use crate::models::Message;

/// Ordered in-memory copy of a thread's messages.
///
/// Mirrors what trailing deletion does to the persisted thread, so an edit or
/// regenerate flow can keep working from the copy it already holds instead of
/// re-reading the thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new(mut messages: Vec<Message>) -> Self {
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Drop the cut point and every message created at or after it.
    /// Unknown ids leave the transcript untouched.
    pub fn truncate_from(&mut self, message_id: &str) -> Vec<Message> {
        let Some(cutoff) = self.get(message_id).map(|m| m.created_at) else {
            return Vec::new();
        };
        let (keep, removed): (Vec<Message>, Vec<Message>) = std::mem::take(&mut self.messages)
            .into_iter()
            .partition(|m| m.created_at < cutoff);
        self.messages = keep;
        removed
    }

    /// Keep the cut point, drop everything created after it
    pub fn truncate_after(&mut self, message_id: &str) -> Vec<Message> {
        let Some(cutoff) = self.get(message_id).map(|m| m.created_at) else {
            return Vec::new();
        };
        let (keep, removed): (Vec<Message>, Vec<Message>) = std::mem::take(&mut self.messages)
            .into_iter()
            .partition(|m| m.created_at <= cutoff);
        self.messages = keep;
        removed
    }

    /// Append a freshly persisted message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Model-facing history; data messages and empty turns are skipped
    pub fn to_llm_messages(&self) -> Vec<threadline_llm::Message> {
        self.messages
            .iter()
            .filter(|m| !m.content.trim().is_empty())
            .filter_map(|m| threadline_llm::Message::try_from(m).ok())
            .collect()
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self::new(messages)
    }
}
