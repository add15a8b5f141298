use colloquy_llm::{ChatRequest, LlmError};
use colloquy_types::Message;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::PoisonError;
use tokio_util::sync::CancellationToken;

use crate::engine::{append_in, replace_in, ConversationEngine};
use crate::error::{EngineError, Result};

/// How a reply stream ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The final, non-partial assistant message
    Completed(Message),
    /// Stopped on request. Holds the last snapshot applied, if any, which
    /// stays in the thread with `partial` set.
    Cancelled(Option<Message>),
}

impl GenerationOutcome {
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Completed(message) => Some(message),
            Self::Cancelled(message) => message.as_ref(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

struct ActiveGeneration {
    serial: u64,
    token: CancellationToken,
}

/// One cancellation token per thread with a live reply
#[derive(Default)]
pub(crate) struct GenerationRegistry {
    active: HashMap<String, ActiveGeneration>,
    next_serial: u64,
}

impl GenerationRegistry {
    /// A cancelled entry whose stream has not wound down yet may be replaced
    fn try_register(&mut self, thread_id: &str, token: CancellationToken) -> Option<u64> {
        if let Some(existing) = self.active.get(thread_id) {
            if !existing.token.is_cancelled() {
                return None;
            }
        }

        self.next_serial += 1;
        let serial = self.next_serial;
        self.active
            .insert(thread_id.to_string(), ActiveGeneration { serial, token });
        Some(serial)
    }

    /// Returns false if a newer generation took the slot
    fn release(&mut self, thread_id: &str, serial: u64) -> bool {
        match self.active.get(thread_id) {
            Some(entry) if entry.serial == serial => {
                self.active.remove(thread_id);
                true
            }
            _ => false,
        }
    }

    fn cancel(&self, thread_id: &str) -> bool {
        match self.active.get(thread_id) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    fn cancel_all(&self) {
        for entry in self.active.values() {
            entry.token.cancel();
        }
    }
}

/// Holds a thread's generation slot; releases it on drop
pub(crate) struct GenerationGuard {
    engine: ConversationEngine,
    thread_id: String,
    serial: u64,
    token: CancellationToken,
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        let released = self
            .engine
            .inner
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .release(&self.thread_id, self.serial);

        if released {
            let thread_id = self.thread_id.as_str();
            self.engine
                .inner
                .state
                .send_if_modified(|state| state.generating.remove(thread_id));
        }
    }
}

impl ConversationEngine {
    /// Stream a reply to `history` into the thread.
    ///
    /// The first snapshot is appended as a new assistant message and every
    /// later one overwrites it under the same id. Cancelling `cancel` stops
    /// the stream cleanly and leaves the message as far as it got.
    /// `system` replaces the default system prompt when given.
    pub async fn stream_reply(
        &self,
        thread_id: &str,
        history: Vec<Message>,
        system: Option<String>,
        cancel: CancellationToken,
    ) -> Result<GenerationOutcome> {
        if self.thread(thread_id).is_none() {
            return Err(EngineError::ThreadNotFound(thread_id.to_string()));
        }
        let guard = self.begin_generation(thread_id, cancel)?;
        self.consume_stream(&guard, history, system).await
    }

    /// Cancel the reply streaming into a thread. No-op if none is running.
    pub fn cancel_generation(&self, thread_id: &str) -> bool {
        let cancelled = self
            .inner
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel(thread_id);
        if cancelled {
            tracing::debug!(thread_id, "Generation cancellation requested");
        }
        cancelled
    }

    pub(crate) fn cancel_all_generations(&self) {
        self.inner
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel_all();
    }

    pub(crate) fn begin_generation(
        &self,
        thread_id: &str,
        token: CancellationToken,
    ) -> Result<GenerationGuard> {
        let serial = self
            .inner
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_register(thread_id, token.clone())
            .ok_or_else(|| EngineError::GenerationInProgress(thread_id.to_string()))?;

        self.inner.state.send_if_modified(|state| state.generating.insert(thread_id.to_string()));

        Ok(GenerationGuard {
            engine: self.clone(),
            thread_id: thread_id.to_string(),
            serial,
            token,
        })
    }

    pub(crate) async fn consume_stream(
        &self,
        guard: &GenerationGuard,
        history: Vec<Message>,
        system: Option<String>,
    ) -> Result<GenerationOutcome> {
        let thread_id = guard.thread_id.as_str();
        let cancel = &guard.token;

        let mut request = ChatRequest::new(self.selected_model(), history);
        if let Some(system) = system {
            request = request.with_system(system);
        }
        tracing::debug!(thread_id, model = %request.model, "Starting generation");

        let mut stream = match self.inner.llm.generate_stream(request, cancel.clone()).await {
            Ok(stream) => stream,
            Err(e) if e.is_abort() => return Ok(GenerationOutcome::Cancelled(None)),
            Err(e) => {
                tracing::warn!(thread_id, "Generation failed to start: {}", e);
                return Err(e.into());
            }
        };

        let mut pinned_id: Option<String> = None;
        let mut last: Option<Message> = None;

        while let Some(item) = stream.next().await {
            let snapshot = match item {
                Ok(snapshot) => snapshot,
                Err(e) if e.is_abort() => {
                    tracing::debug!(thread_id, "Generation cancelled");
                    return Ok(GenerationOutcome::Cancelled(last));
                }
                Err(e) => {
                    tracing::warn!(thread_id, "Generation failed: {}", e);
                    return Err(e.into());
                }
            };

            let snapshot = match &pinned_id {
                Some(id) => Message {
                    id: id.clone(),
                    ..snapshot
                },
                None => snapshot,
            };

            if !self.apply_snapshot(thread_id, pinned_id.is_none(), &snapshot, cancel) {
                if cancel.is_cancelled() {
                    tracing::debug!(thread_id, "Generation cancelled");
                    return Ok(GenerationOutcome::Cancelled(last));
                }
                continue;
            }

            if pinned_id.is_none() {
                pinned_id = Some(snapshot.id.clone());
            }
            last = Some(snapshot);
        }

        if cancel.is_cancelled() {
            return Ok(GenerationOutcome::Cancelled(last));
        }

        match last {
            Some(message) if !message.partial => {
                tracing::debug!(thread_id, message_id = %message.id, "Generation completed");
                Ok(GenerationOutcome::Completed(message))
            }
            _ => Err(EngineError::Generation(LlmError::Stream(
                "stream ended before the final snapshot".to_string(),
            ))),
        }
    }

    /// Fold one snapshot into state. The token is checked under the state
    /// lock, so nothing lands after a cancelling edit has applied.
    fn apply_snapshot(
        &self,
        thread_id: &str,
        first: bool,
        snapshot: &Message,
        cancel: &CancellationToken,
    ) -> bool {
        let mut applied = false;
        self.mutate(|state, writer| {
            if cancel.is_cancelled() {
                return None;
            }
            let pending = if first {
                append_in(state, writer, thread_id, snapshot.clone())
            } else {
                replace_in(state, writer, thread_id, &snapshot.id, snapshot.clone())
            };
            applied = pending.is_some();
            pending
        });
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_refuses_live_duplicate() {
        let mut registry = GenerationRegistry::default();
        let token = CancellationToken::new();

        assert!(registry.try_register("t", token.clone()).is_some());
        assert!(registry.try_register("t", CancellationToken::new()).is_none());
        assert!(registry.try_register("other", CancellationToken::new()).is_some());
    }

    #[test]
    fn test_cancelled_slot_can_be_taken_over() {
        let mut registry = GenerationRegistry::default();
        let old = CancellationToken::new();
        let old_serial = registry.try_register("t", old.clone()).unwrap();

        assert!(registry.cancel("t"));
        assert!(old.is_cancelled());

        let new_serial = registry.try_register("t", CancellationToken::new()).unwrap();
        assert_ne!(old_serial, new_serial);

        // The old stream winding down must not free the new slot
        assert!(!registry.release("t", old_serial));
        assert!(registry.release("t", new_serial));
        assert!(!registry.cancel("t"));
    }

    #[test]
    fn test_outcome_accessors() {
        let done = GenerationOutcome::Completed(Message::assistant("a", "hi"));
        assert_eq!(done.message().unwrap().content, "hi");
        assert!(!done.is_cancelled());

        let stopped = GenerationOutcome::Cancelled(None);
        assert!(stopped.is_cancelled());
        assert!(stopped.message().is_none());
    }
}
