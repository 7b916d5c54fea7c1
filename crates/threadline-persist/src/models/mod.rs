mod thread;
mod message;
mod summary;

// Database-agnostic models
pub use thread::Thread;
pub use message::{Message, MessageRole, MessagePart, NewMessage};
pub use summary::MessageSummary;
