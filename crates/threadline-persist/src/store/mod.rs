mod threads;
mod messages;
mod summaries;

use std::sync::Arc;

use crate::dbs::memory::MemoryPersistenceClient;
use crate::trait_client::PersistenceClient;

pub use messages::TrailingDeletion;

pub const DEFAULT_THREAD_TITLE: &str = "New Chat";

/// Caller-scoped access to threads, messages and summaries.
///
/// Every operation naming a thread resolves it through
/// [`crate::check_thread_ownership`] before touching the backend.
#[derive(Clone)]
pub struct ChatStore {
    backend: Arc<dyn PersistenceClient>,
}

impl ChatStore {
    pub fn new(backend: Arc<dyn PersistenceClient>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPersistenceClient::new()))
    }

    pub fn backend(&self) -> &dyn PersistenceClient {
        self.backend.as_ref()
    }
}
