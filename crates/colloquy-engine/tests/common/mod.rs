#![allow(dead_code)]

use async_trait::async_trait;
use colloquy_engine::{ChatState, ConversationEngine, LocalSession, SUMMARY_INSTRUCTION};
use colloquy_llm::{ChatClient, ChatRequest, LlmError, SnapshotStream};
use colloquy_persist::{
    MemoryPersistenceClient, MessagePatch, PersistError, PersistenceClient, ThreadPatch,
};
use colloquy_types::{Message, Thread};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// One step of a scripted reply stream
#[derive(Debug, Clone)]
pub enum Step {
    /// Append text and yield a partial snapshot
    Delta(&'static str),
    /// Yield the final snapshot
    Finish,
    /// Use a different message id from now on
    Rekey(&'static str),
    Fail(&'static str),
    /// Park until cancelled, then yield the abort signal
    WaitForCancel,
}

/// `ChatClient` that replays queued scripts and records every request
#[derive(Default)]
pub struct ScriptedClient {
    streams: Mutex<VecDeque<Vec<Step>>>,
    summaries: Mutex<VecDeque<Result<String, String>>>,
    pub requests: Mutex<Vec<ChatRequest>>,
    pub generate_calls: AtomicUsize,
    /// Summary calls never resolve
    pub hang_summaries: AtomicBool,
    counter: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_stream(&self, steps: Vec<Step>) {
        self.streams.lock().unwrap().push_back(steps);
    }

    pub fn push_summary(&self, summary: Result<&str, &str>) {
        self.summaries
            .lock()
            .unwrap()
            .push_back(summary.map(str::to_string).map_err(str::to_string));
    }

    /// Contents of the history sent with the n-th streaming request
    pub fn stream_history(&self, n: usize) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.system.as_deref() != Some(SUMMARY_INSTRUCTION))
            .nth(n)
            .map(|r| r.messages.iter().map(|m| m.content.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn generate(&self, request: ChatRequest) -> Result<Message, LlmError> {
        self.requests.lock().unwrap().push(request);
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_summaries.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let next = self.summaries.lock().unwrap().pop_front();
        match next.unwrap_or_else(|| Ok("Test Topic".to_string())) {
            Ok(text) => Ok(Message::assistant("summary", text)),
            Err(message) => Err(LlmError::Api {
                status: 500,
                message,
            }),
        }
    }

    async fn generate_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<SnapshotStream, LlmError> {
        self.requests.lock().unwrap().push(request);

        let steps = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![Step::Delta("ok"), Step::Finish]);
        let n = self.counter.fetch_add(1, Ordering::SeqCst);

        let stream = async_stream::stream! {
            let mut id = format!("reply-{}", n);
            let mut content = String::new();

            for step in steps {
                if cancel.is_cancelled() {
                    yield Err(LlmError::Aborted);
                    break;
                }
                match step {
                    Step::Delta(text) => {
                        content.push_str(text);
                        yield Ok(Message::snapshot(id.clone(), content.clone(), true));
                    }
                    Step::Finish => {
                        yield Ok(Message::snapshot(id.clone(), content.clone(), false));
                    }
                    Step::Rekey(new_id) => id = new_id.to_string(),
                    Step::Fail(message) => {
                        yield Err(LlmError::Stream(message.to_string()));
                        break;
                    }
                    Step::WaitForCancel => {
                        cancel.cancelled().await;
                        yield Err(LlmError::Aborted);
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Memory backend that records calls and can be told to fail
#[derive(Default)]
pub struct RecordingPersistence {
    pub store: MemoryPersistenceClient,
    pub ops: Mutex<Vec<String>>,
    pub fail_writes: AtomicBool,
    pub fail_loads: AtomicBool,
}

impl RecordingPersistence {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: &str) -> Result<(), PersistError> {
        self.ops.lock().unwrap().push(op.to_string());
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistError::Connection("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceClient for RecordingPersistence {
    async fn load_threads(&self, user_id: &str) -> Result<Vec<Thread>, PersistError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(PersistError::Connection("injected failure".to_string()));
        }
        self.store.load_threads(user_id).await
    }

    async fn create_thread(&self, thread: &Thread, user_id: &str) -> Result<(), PersistError> {
        self.record("create_thread")?;
        self.store.create_thread(thread, user_id).await
    }

    async fn add_message(&self, thread_id: &str, message: &Message) -> Result<(), PersistError> {
        self.record("add_message")?;
        self.store.add_message(thread_id, message).await
    }

    async fn update_message(
        &self,
        message_id: &str,
        patch: MessagePatch,
    ) -> Result<(), PersistError> {
        self.record("update_message")?;
        self.store.update_message(message_id, patch).await
    }

    async fn delete_messages(&self, message_ids: &[String]) -> Result<(), PersistError> {
        self.record("delete_messages")?;
        self.store.delete_messages(message_ids).await
    }

    async fn update_thread(&self, thread_id: &str, patch: ThreadPatch) -> Result<(), PersistError> {
        self.record("update_thread")?;
        self.store.update_thread(thread_id, patch).await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), PersistError> {
        self.record("delete_thread")?;
        self.store.delete_thread(thread_id).await
    }
}

pub const USER: &str = "tester";

pub fn engine_with(
    client: Arc<ScriptedClient>,
    persistence: Arc<RecordingPersistence>,
) -> ConversationEngine {
    ConversationEngine::builder()
        .llm_client(client)
        .persistence(persistence)
        .credentials(Arc::new(LocalSession::signed_in(USER)))
        .build()
        .unwrap()
}

pub fn contents(thread: &Thread) -> Vec<(String, String)> {
    thread
        .messages
        .iter()
        .map(|m| (m.role.to_string(), m.content.clone()))
        .collect()
}

/// Wait until the engine state satisfies `predicate`
pub async fn wait_for_state<F>(rx: &mut watch::Receiver<ChatState>, predicate: F)
where
    F: FnMut(&ChatState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for engine state")
        .expect("engine dropped");
}
