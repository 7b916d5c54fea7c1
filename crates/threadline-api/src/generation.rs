// One in-flight generation per thread

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::response::sse::Event;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

struct ActiveGeneration {
    id: Uuid,
    handle: JoinHandle<()>,
    /// The client's event stream; closes once this and the task are gone
    events: mpsc::Sender<Event>,
}

impl ActiveGeneration {
    /// Abort and wait until the task is gone, so nothing it would have
    /// written can land after this returns. The client gets a final
    /// `stopped` event.
    async fn cancel(self) {
        self.handle.abort();
        let _ = self.handle.await;

        let stopped = Event::default()
            .event("stopped")
            .data(serde_json::json!({ "generation_id": self.id }).to_string());
        let _ = self.events.try_send(stopped);
    }
}

/// Registry of running generation tasks keyed by thread id
#[derive(Default)]
pub struct GenerationRegistry {
    active: Mutex<HashMap<String, ActiveGeneration>>,
}

impl GenerationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` as the thread's generation, aborting any previous one.
    /// `events` is the channel `task` reports to.
    pub async fn start<F>(
        self: &Arc<Self>,
        thread_id: &str,
        events: mpsc::Sender<Event>,
        task: F,
    ) -> Uuid
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.stop(thread_id).await;

        let id = Uuid::new_v4();
        let registry = Arc::clone(self);
        let key = thread_id.to_string();

        // Held across spawn + insert so the task's own cleanup cannot run first
        let mut active = self.active.lock().await;
        let handle = tokio::spawn(async move {
            task.await;
            registry.finish(&key, id).await;
        });

        let generation = ActiveGeneration { id, handle, events };
        if let Some(raced) = active.insert(thread_id.to_string(), generation) {
            raced.handle.abort();
        }

        tracing::debug!(thread_id, generation_id = %id, "Generation started");
        id
    }

    /// Abort the thread's generation; false when none was running
    pub async fn stop(&self, thread_id: &str) -> bool {
        let previous = self.active.lock().await.remove(thread_id);
        match previous {
            Some(generation) => {
                let id = generation.id;
                generation.cancel().await;
                tracing::info!(thread_id, generation_id = %id, "Generation stopped");
                true
            }
            None => false,
        }
    }

    pub async fn is_active(&self, thread_id: &str) -> bool {
        self.active.lock().await.contains_key(thread_id)
    }

    async fn finish(&self, thread_id: &str, id: Uuid) {
        let mut active = self.active.lock().await;
        if active.get(thread_id).map(|g| g.id) == Some(id) {
            active.remove(thread_id);
        }
    }
}
