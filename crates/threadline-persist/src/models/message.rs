use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Database-agnostic message model
///
/// Messages are never updated in place. Edits delete the trailing part of the
/// thread and insert a replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<MessagePart>>,
    /// Assigned by the backend; defines transcript order
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Data,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::Data => "data",
        }
    }
}

/// Structured fragment of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        reasoning: String,
    },
    ToolInvocation {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        args: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
    },
    StepStart,
}

/// Message as submitted by a caller, before the backend assigns id and time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<MessagePart>>,
}

impl NewMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            parts: None,
        }
    }

    /// User message carrying a single text part
    pub fn user(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            role: MessageRole::User,
            parts: Some(vec![MessagePart::Text { text: content.clone() }]),
            content,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn with_parts(mut self, parts: Vec<MessagePart>) -> Self {
        self.parts = Some(parts);
        self
    }
}

impl From<&Message> for NewMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            parts: message.parts.clone(),
        }
    }
}

// Conversion: Message → threadline_llm::Message
impl TryFrom<&Message> for threadline_llm::Message {
    type Error = anyhow::Error;

    fn try_from(msg: &Message) -> Result<Self, Self::Error> {
        match msg.role {
            MessageRole::User => Ok(threadline_llm::Message::human(msg.content.clone())),
            // Reasoning parts stay local; only the answer goes back to the model
            MessageRole::Assistant => Ok(threadline_llm::Message::ai(msg.content.clone())),
            MessageRole::System => Ok(threadline_llm::Message::system(msg.content.clone())),
            MessageRole::Data => {
                Err(anyhow::anyhow!("Data messages are not converted to LLM messages"))
            }
        }
    }
}
