use colloquy_types::Message;
use tokio_util::sync::CancellationToken;

use crate::engine::ConversationEngine;
use crate::error::{EngineError, Result};
use crate::generation::GenerationOutcome;

impl ConversationEngine {
    /// Send user input and stream the reply.
    ///
    /// Blank input is ignored (`Ok(None)`). On a thread's first message the
    /// topic is summarised into its title by a background task, which never
    /// holds up the reply.
    pub async fn send_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<Option<GenerationOutcome>> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let thread = self
            .thread(thread_id)
            .ok_or_else(|| EngineError::ThreadNotFound(thread_id.to_string()))?;
        let first_message = thread.messages.is_empty();

        let guard = self.begin_generation(thread_id, CancellationToken::new())?;

        // Fire and forget; a failed insert is logged by the writer
        drop(self.append_message(thread_id, Message::user(content)));
        let history = self.history(thread_id)?;

        if first_message {
            self.spawn_topic_summary(thread_id, content);
        }
        self.consume_stream(&guard, history, None).await.map(Some)
    }

    /// Edit a message and regenerate everything after it.
    ///
    /// A reply still streaming into the thread is cancelled before the edit
    /// is applied. An unknown message id is a silent no-op (`Ok(None)`).
    pub async fn edit_message(
        &self,
        thread_id: &str,
        message_id: &str,
        new_content: &str,
    ) -> Result<Option<GenerationOutcome>> {
        let new_content = new_content.trim();
        if new_content.is_empty() {
            return Ok(None);
        }

        self.cancel_generation(thread_id);

        let thread = self
            .thread(thread_id)
            .ok_or_else(|| EngineError::ThreadNotFound(thread_id.to_string()))?;
        let Some(index) = thread.position_of(message_id) else {
            tracing::debug!(thread_id, message_id, "Edited message no longer exists");
            return Ok(None);
        };

        let guard = self.begin_generation(thread_id, CancellationToken::new())?;

        let edited = thread.messages[index].with_content(new_content);
        drop(self.replace_message(thread_id, message_id, edited));
        drop(self.truncate_after(thread_id, index));

        let history = self.history(thread_id)?;
        self.consume_stream(&guard, history, None).await.map(Some)
    }
}
