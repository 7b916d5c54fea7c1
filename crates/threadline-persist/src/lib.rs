pub mod models;
pub mod error;
pub mod trait_client;
pub mod dbs;
pub mod guard;
pub mod store;
pub mod transcript;

pub use models::{Thread, Message, MessageRole, MessagePart, NewMessage, MessageSummary};
pub use error::{PersistError, AuthorizationError, Result};
pub use trait_client::PersistenceClient;
pub use dbs::memory::MemoryPersistenceClient;
#[cfg(feature = "mongodb")]
pub use dbs::mongo::MongoPersistenceClient;
pub use guard::{Identity, check_thread_ownership, require_identity};
pub use store::{ChatStore, TrailingDeletion, DEFAULT_THREAD_TITLE};
pub use transcript::Transcript;
