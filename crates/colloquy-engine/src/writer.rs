use colloquy_persist::{MessagePatch, PersistError, PersistenceClient, ThreadPatch};
use colloquy_types::{Message, Thread};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

/// A remote write queued behind an optimistic state change
#[derive(Debug, Clone)]
pub(crate) enum PersistOp {
    CreateThread { thread: Thread, user_id: String },
    AddMessage { thread_id: String, message: Message },
    UpdateMessage { message_id: String, patch: MessagePatch },
    DeleteMessages { message_ids: Vec<String> },
    UpdateThread { thread_id: String, patch: ThreadPatch },
    DeleteThread { thread_id: String },
    /// Completes once everything queued before it has been applied
    Barrier,
}

impl PersistOp {
    fn name(&self) -> &'static str {
        match self {
            Self::CreateThread { .. } => "create_thread",
            Self::AddMessage { .. } => "add_message",
            Self::UpdateMessage { .. } => "update_message",
            Self::DeleteMessages { .. } => "delete_messages",
            Self::UpdateThread { .. } => "update_thread",
            Self::DeleteThread { .. } => "delete_thread",
            Self::Barrier => "barrier",
        }
    }

    async fn apply(self, client: &dyn PersistenceClient) -> Result<(), PersistError> {
        match self {
            Self::CreateThread { thread, user_id } => client.create_thread(&thread, &user_id).await,
            Self::AddMessage { thread_id, message } => client.add_message(&thread_id, &message).await,
            Self::UpdateMessage { message_id, patch } => {
                client.update_message(&message_id, patch).await
            }
            Self::DeleteMessages { message_ids } => client.delete_messages(&message_ids).await,
            Self::UpdateThread { thread_id, patch } => {
                client.update_thread(&thread_id, patch).await
            }
            Self::DeleteThread { thread_id } => client.delete_thread(&thread_id).await,
            Self::Barrier => Ok(()),
        }
    }
}

struct Job {
    op: PersistOp,
    done: oneshot::Sender<Result<(), PersistError>>,
}

/// Outcome of one queued remote write.
///
/// Awaiting it yields the backend's answer. Dropping it is the normal
/// fire-and-forget path; the write still happens and failures are logged.
#[derive(Debug)]
pub struct Pending {
    rx: Option<oneshot::Receiver<Result<(), PersistError>>>,
}

impl Pending {
    /// Nothing was queued
    pub(crate) fn ready() -> Self {
        Self { rx: None }
    }
}

impl Future for Pending {
    type Output = Result<(), PersistError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.rx.as_mut() {
            None => Poll::Ready(Ok(())),
            Some(rx) => Pin::new(rx).poll(cx).map(|received| {
                received.unwrap_or_else(|_| {
                    Err(PersistError::Internal(
                        "persistence writer stopped".to_string(),
                    ))
                })
            }),
        }
    }
}

/// Single consumer that applies remote writes in the order they were queued
pub(crate) struct PersistWriter {
    tx: mpsc::UnboundedSender<Job>,
}

impl PersistWriter {
    /// Must be called from within a Tokio runtime
    pub(crate) fn spawn(client: Arc<dyn PersistenceClient>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(client, rx));
        Self { tx }
    }

    pub(crate) fn enqueue(&self, op: PersistOp) -> Pending {
        let (done, rx) = oneshot::channel();
        if let Err(mpsc::error::SendError(job)) = self.tx.send(Job { op, done }) {
            tracing::error!(op = job.op.name(), "Persistence writer is gone, dropping write");
        }
        Pending { rx: Some(rx) }
    }

    pub(crate) async fn flush(&self) {
        // The barrier itself cannot fail
        let _ = self.enqueue(PersistOp::Barrier).await;
    }
}

async fn run_writer(client: Arc<dyn PersistenceClient>, mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(Job { op, done }) = rx.recv().await {
        let name = op.name();
        let result = op.apply(client.as_ref()).await;
        if let Err(e) = &result {
            tracing::error!(op = name, "Failed to persist change: {}", e);
        }
        let _ = done.send(result);
    }
    tracing::debug!("Persistence writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_persist::{MemoryPersistenceClient, NoopPersistenceClient};

    #[tokio::test]
    async fn test_writes_apply_in_order() {
        let store = Arc::new(MemoryPersistenceClient::new());
        let writer = PersistWriter::spawn(store.clone());

        let thread = Thread::new();
        let message = Message::user("hi");

        // Fire and forget; the add would fail if it overtook the create
        drop(writer.enqueue(PersistOp::CreateThread {
            thread: thread.clone(),
            user_id: "u".to_string(),
        }));
        let add = writer.enqueue(PersistOp::AddMessage {
            thread_id: thread.id.clone(),
            message,
        });

        add.await.unwrap();
        assert_eq!(store.message_count().await, 1);
    }

    #[tokio::test]
    async fn test_failure_is_reported_to_awaiter() {
        let writer = PersistWriter::spawn(Arc::new(MemoryPersistenceClient::new()));
        let result = writer
            .enqueue(PersistOp::AddMessage {
                thread_id: "missing".to_string(),
                message: Message::user("x"),
            })
            .await;
        assert!(matches!(result, Err(PersistError::ThreadNotFound(_))));
    }

    #[tokio::test]
    async fn test_ready_pending_resolves_ok() {
        assert!(Pending::ready().await.is_ok());
        let writer = PersistWriter::spawn(Arc::new(NoopPersistenceClient::new()));
        writer.flush().await;
    }
}
