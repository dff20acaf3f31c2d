//! Background writer that applies document writes one at a time, in the
//! order they were submitted.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::error::PersistenceError;
use crate::store::{Document, DocumentStore};

enum WriteCommand {
    Put {
        document: Document,
        merge: bool,
        ack: Option<oneshot::Sender<Result<(), PersistenceError>>>,
    },
    Flush {
        done: oneshot::Sender<Option<PersistenceError>>,
    },
}

/// Handle to the writer task for one document key.
///
/// Dropping the handle lets the task drain what is already queued and exit.
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<WriteCommand>,
}

impl WriteQueue {
    /// Start the writer task. Must be called from within a Tokio runtime.
    pub fn spawn(store: Arc<dyn DocumentStore>, key: String) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(store, key, rx));
        WriteQueue { tx }
    }

    /// Queue a write without waiting for it. A failure is logged and kept for
    /// the next [`WriteQueue::flush`].
    pub fn submit(&self, document: Document, merge: bool) {
        let command = WriteCommand::Put {
            document,
            merge,
            ack: None,
        };
        if self.tx.send(command).is_err() {
            tracing::warn!("Write queue closed, dropping document write");
        }
    }

    /// Queue a write and wait for its result.
    pub async fn write(&self, document: Document, merge: bool) -> Result<(), PersistenceError> {
        let (ack, result) = oneshot::channel();
        self.tx
            .send(WriteCommand::Put {
                document,
                merge,
                ack: Some(ack),
            })
            .map_err(|_| PersistenceError::WriterClosed)?;
        result.await.map_err(|_| PersistenceError::WriterClosed)?
    }

    /// Wait until every write queued so far has been attempted. Returns the
    /// most recent failure among queued writes since the previous flush.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        let (done, failure) = oneshot::channel();
        self.tx
            .send(WriteCommand::Flush { done })
            .map_err(|_| PersistenceError::WriterClosed)?;
        match failure.await.map_err(|_| PersistenceError::WriterClosed)? {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

async fn run_writer(
    store: Arc<dyn DocumentStore>,
    key: String,
    mut rx: mpsc::UnboundedReceiver<WriteCommand>,
) {
    let mut last_failure = None;

    while let Some(command) = rx.recv().await {
        match command {
            WriteCommand::Put {
                document,
                merge,
                ack,
            } => {
                let result = store.put(&key, document, merge).await;
                match &result {
                    Ok(()) => tracing::debug!("Saved game document '{}'", key),
                    Err(e) => tracing::warn!("Failed to save game document '{}': {}", key, e),
                }
                match ack {
                    Some(ack) => {
                        let _ = ack.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            last_failure = Some(e);
                        }
                    }
                }
            }
            WriteCommand::Flush { done } => {
                let _ = done.send(last_failure.take());
            }
        }
    }

    tracing::debug!("Write queue for '{}' stopped", key);
}
