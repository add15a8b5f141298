use colloquy_llm::ChatRequest;
use colloquy_types::Message;

use crate::engine::ConversationEngine;

pub const SUMMARY_INSTRUCTION: &str = "You are a helpful assistant. Please provide a brief 2-4 word \
summary of the topic or main question being asked. Respond with ONLY the summary, no other text.";

impl ConversationEngine {
    pub(crate) fn spawn_topic_summary(&self, thread_id: &str, content: &str) {
        let engine = self.clone();
        let thread_id = thread_id.to_string();
        let content = content.to_string();
        tokio::spawn(async move {
            engine.summarize_topic(&thread_id, &content).await;
        });
    }

    /// Title the thread after the topic of `content`.
    ///
    /// Returns the new title. A failed call or an empty answer leaves the
    /// current title in place.
    pub async fn summarize_topic(&self, thread_id: &str, content: &str) -> Option<String> {
        let model = self
            .inner
            .summary_model
            .clone()
            .unwrap_or_else(|| self.selected_model());
        let request =
            ChatRequest::new(model, vec![Message::user(content)]).with_system(SUMMARY_INSTRUCTION);

        let summary = match self.inner.llm.generate(request).await {
            Ok(message) => message.content,
            Err(e) => {
                tracing::warn!(thread_id, "Topic summary failed: {}", e);
                return None;
            }
        };

        let title = summary.trim();
        if title.is_empty() {
            tracing::warn!(thread_id, "Topic summary was empty");
            return None;
        }

        drop(self.rename_thread(thread_id, title));
        Some(title.to_string())
    }
}
