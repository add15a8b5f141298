use async_trait::async_trait;
use colloquy_types::{Message, Thread};

use crate::error::Result;
use crate::models::{MessagePatch, ThreadPatch};

/// Trait for durable storage of threads and their messages
///
/// Implementations mirror the engine's in-memory collection; they never own
/// it. The transient `partial` flag of a message is not stored.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// All threads of a user, most recently updated first, each with its
    /// messages in creation order
    async fn load_threads(&self, user_id: &str) -> Result<Vec<Thread>>;

    async fn create_thread(&self, thread: &Thread, user_id: &str) -> Result<()>;

    /// Insert a message and bump the thread's `updated_at`
    async fn add_message(&self, thread_id: &str, message: &Message) -> Result<()>;

    async fn update_message(&self, message_id: &str, patch: MessagePatch) -> Result<()>;

    /// No-op on empty input
    async fn delete_messages(&self, message_ids: &[String]) -> Result<()>;

    async fn update_thread(&self, thread_id: &str, patch: ThreadPatch) -> Result<()>;

    /// Delete a thread's messages, then the thread record
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;
}
