use colloquy_llm::ChatClient;
use colloquy_persist::{MessagePatch, PersistenceClient, ThreadPatch};
use colloquy_types::{Message, Thread};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::auth::{resolve_user_id, CredentialProvider};
use crate::builder::EngineBuilder;
use crate::error::{EngineError, Result};
use crate::generation::GenerationRegistry;
use crate::state::ChatState;
use crate::writer::{Pending, PersistOp, PersistWriter};

/// Owner of the in-memory conversation collection.
///
/// Every mutation is applied to memory synchronously and the matching remote
/// write is queued in the same step, so the write order always follows the
/// order in which state changed. Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct ConversationEngine {
    pub(crate) inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    pub(crate) state: watch::Sender<ChatState>,
    pub(crate) writer: PersistWriter,
    pub(crate) persistence: Arc<dyn PersistenceClient>,
    pub(crate) llm: Arc<dyn ChatClient>,
    pub(crate) credentials: Arc<dyn CredentialProvider>,
    pub(crate) default_model: String,
    pub(crate) summary_model: Option<String>,
    pub(crate) generations: Mutex<GenerationRegistry>,
}

impl ConversationEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub(crate) fn from_parts(
        persistence: Arc<dyn PersistenceClient>,
        llm: Arc<dyn ChatClient>,
        credentials: Arc<dyn CredentialProvider>,
        default_model: String,
        summary_model: Option<String>,
    ) -> Self {
        let (state, _) = watch::channel(ChatState::new(default_model.clone()));
        let writer = PersistWriter::spawn(persistence.clone());

        Self {
            inner: Arc::new(EngineInner {
                state,
                writer,
                persistence,
                llm,
                credentials,
                default_model,
                summary_model,
                generations: Mutex::new(GenerationRegistry::default()),
            }),
        }
    }

    // ========================================================================
    // OBSERVATION
    // ========================================================================

    /// Receiver that sees every committed state
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> ChatState {
        self.inner.state.borrow().clone()
    }

    pub fn threads(&self) -> Vec<Thread> {
        self.inner.state.borrow().threads.clone()
    }

    pub fn thread(&self, thread_id: &str) -> Option<Thread> {
        self.inner.state.borrow().thread(thread_id).cloned()
    }

    pub fn active_thread_id(&self) -> Option<String> {
        self.inner.state.borrow().active_thread_id.clone()
    }

    pub fn active_thread(&self) -> Option<Thread> {
        self.inner.state.borrow().active_thread().cloned()
    }

    pub fn selected_model(&self) -> String {
        self.inner.state.borrow().selected_model.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn is_generating(&self, thread_id: &str) -> bool {
        self.inner.state.borrow().is_generating(thread_id)
    }

    /// Id persistence calls are scoped by for the signed-in user
    pub fn current_user_id(&self) -> String {
        resolve_user_id(self.inner.credentials.as_ref())
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.inner.credentials
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Replace the in-memory collection with the user's stored threads.
    ///
    /// On failure the previous collection is left untouched.
    pub async fn load_all(&self, user_id: &str) -> Result<Vec<Thread>> {
        self.inner.state.send_modify(|state| state.loading = true);

        // Let queued writes land so the load reflects them
        self.flush().await;

        match self.inner.persistence.load_threads(user_id).await {
            Ok(threads) => {
                self.inner.state.send_modify(|state| {
                    state.replace_threads(threads);
                    state.loading = false;
                });
                let threads = self.threads();
                tracing::info!(user_id, threads = threads.len(), "Loaded conversations");
                Ok(threads)
            }
            Err(e) => {
                self.inner.state.send_modify(|state| state.loading = false);
                tracing::error!(user_id, "Failed to load conversations: {}", e);
                Err(EngineError::Load(e))
            }
        }
    }

    /// Create an empty thread, put it first and make it active.
    ///
    /// The remote insert is best-effort; a failure is logged by the writer
    /// and the thread stays visible locally.
    pub fn create_thread(&self, user_id: &str) -> Thread {
        let thread = Thread::new();
        self.mutate(|state, writer| {
            state.insert_thread(thread.clone());
            Some(writer.enqueue(PersistOp::CreateThread {
                thread: thread.clone(),
                user_id: user_id.to_string(),
            }))
        });
        tracing::debug!(thread_id = %thread.id, "Created thread");
        thread
    }

    /// Pointer change only; an unknown id simply matches no thread
    pub fn set_active_thread(&self, thread_id: &str) {
        self.inner.state.send_if_modified(|state| {
            if state.active_thread_id.as_deref() == Some(thread_id) {
                return false;
            }
            state.active_thread_id = Some(thread_id.to_string());
            true
        });
    }

    pub fn set_selected_model(&self, model: impl Into<String>) {
        let model = model.into();
        if colloquy_llm::find_model(&model).is_none() {
            tracing::warn!(model = %model, "Selected model is not in the catalogue");
        }
        self.inner.state.send_modify(|state| state.selected_model = model);
    }

    /// Append to the thread and queue the remote insert.
    ///
    /// The in-memory append is never rolled back. Await the returned
    /// [`Pending`] to learn whether the remote write succeeded.
    pub fn append_message(&self, thread_id: &str, message: Message) -> Pending {
        self.mutate(|state, writer| append_in(state, writer, thread_id, message))
    }

    /// Replace a message wholesale and queue the content overwrite.
    /// Unknown ids are ignored.
    pub fn replace_message(&self, thread_id: &str, message_id: &str, message: Message) -> Pending {
        self.mutate(|state, writer| replace_in(state, writer, thread_id, message_id, message))
    }

    /// Remove every message after `index` and queue a batch delete of exactly
    /// those ids. Nothing is sent when nothing was removed.
    pub fn truncate_after(&self, thread_id: &str, index: usize) -> Pending {
        self.mutate(|state, writer| {
            let message_ids = state.truncate_after(thread_id, index);
            if message_ids.is_empty() {
                return None;
            }
            Some(writer.enqueue(PersistOp::DeleteMessages { message_ids }))
        })
    }

    pub fn rename_thread(&self, thread_id: &str, title: &str) -> Pending {
        self.mutate(|state, writer| {
            let updated_at = state.rename_thread(thread_id, title)?;
            Some(writer.enqueue(PersistOp::UpdateThread {
                thread_id: thread_id.to_string(),
                patch: ThreadPatch::rename(title, updated_at),
            }))
        })
    }

    /// Remove the thread and cascade the delete remotely. A reply streaming
    /// into it is cancelled first.
    pub fn delete_thread(&self, thread_id: &str) -> Pending {
        self.cancel_generation(thread_id);
        self.mutate(|state, writer| {
            if !state.remove_thread(thread_id) {
                return None;
            }
            Some(writer.enqueue(PersistOp::DeleteThread {
                thread_id: thread_id.to_string(),
            }))
        })
    }

    /// Forget all in-memory state without touching the backend
    pub fn reset(&self) {
        self.cancel_all_generations();
        let default_model = self.inner.default_model.clone();
        self.inner.state.send_modify(|state| state.clear(&default_model));
        tracing::debug!("Engine state reset");
    }

    /// Wait until every remote write queued so far has been applied
    pub async fn flush(&self) {
        self.inner.writer.flush().await;
    }

    /// History to condition a reply on
    pub(crate) fn history(&self, thread_id: &str) -> Result<Vec<Message>> {
        self.inner
            .state
            .borrow()
            .thread(thread_id)
            .map(|t| t.messages.clone())
            .ok_or_else(|| EngineError::ThreadNotFound(thread_id.to_string()))
    }

    /// Apply a transition; state observers are notified only when a remote
    /// write was queued
    pub(crate) fn mutate<F>(&self, f: F) -> Pending
    where
        F: FnOnce(&mut ChatState, &PersistWriter) -> Option<Pending>,
    {
        let mut pending = None;
        self.inner.state.send_if_modified(|state| {
            pending = f(state, &self.inner.writer);
            pending.is_some()
        });
        pending.unwrap_or_else(Pending::ready)
    }
}

pub(crate) fn append_in(
    state: &mut ChatState,
    writer: &PersistWriter,
    thread_id: &str,
    message: Message,
) -> Option<Pending> {
    if !state.append_message(thread_id, message.clone()) {
        tracing::warn!(thread_id, "Append to unknown thread ignored");
        return None;
    }
    Some(writer.enqueue(PersistOp::AddMessage {
        thread_id: thread_id.to_string(),
        message,
    }))
}

pub(crate) fn replace_in(
    state: &mut ChatState,
    writer: &PersistWriter,
    thread_id: &str,
    message_id: &str,
    message: Message,
) -> Option<Pending> {
    let stored = state.replace_message(thread_id, message_id, message)?;
    Some(writer.enqueue(PersistOp::UpdateMessage {
        message_id: stored.id,
        patch: MessagePatch {
            content: Some(stored.content),
            role: Some(stored.role),
        },
    }))
}
