//! Bounded multi-consumer channel with in-band shutdown.
//!
//! Built on `tokio::sync::mpsc`. Consumers share the receiving half behind a
//! mutex, so each message is delivered to exactly one of them. A full queue
//! makes `send` wait, which is what throttles the producer.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::trace;

use kclip_models::{ClipTask, FailureRecord};

use crate::error::{QueueError, QueueResult};

/// A message travelling through a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueMessage<T> {
    /// A unit of work.
    Item(T),
    /// Tells exactly one consumer to stop.
    Shutdown,
}

/// Producing half. Cheap to clone.
#[derive(Debug)]
pub struct QueueSender<T> {
    inner: mpsc::Sender<QueueMessage<T>>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> QueueSender<T> {
    /// Enqueue an item, waiting while the queue is full.
    pub async fn send(&self, item: T) -> QueueResult<()> {
        self.inner
            .send(QueueMessage::Item(item))
            .await
            .map_err(|_| QueueError::Closed)
    }

    /// Enqueue one shutdown sentinel.
    pub async fn send_shutdown(&self) -> QueueResult<()> {
        trace!("Enqueueing shutdown sentinel");
        self.inner
            .send(QueueMessage::Shutdown)
            .await
            .map_err(|_| QueueError::Closed)
    }

    /// Number of messages currently buffered.
    pub fn len(&self) -> usize {
        self.inner.max_capacity() - self.inner.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether every consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Consuming half, shared by all consumers of a queue. Cheap to clone.
#[derive(Debug)]
pub struct QueueReceiver<T> {
    inner: Arc<Mutex<mpsc::Receiver<QueueMessage<T>>>>,
}

impl<T> Clone for QueueReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> QueueReceiver<T> {
    /// Wait for the next message.
    ///
    /// Returns `None` once every sender is dropped and the buffer is drained.
    pub async fn recv(&self) -> Option<QueueMessage<T>> {
        let mut rx = self.inner.lock().await;
        rx.recv().await
    }
}

/// Create a bounded queue holding at most `capacity` messages.
pub fn bounded<T>(capacity: usize) -> QueueResult<(QueueSender<T>, QueueReceiver<T>)> {
    if capacity == 0 {
        return Err(QueueError::ZeroCapacity);
    }

    let (tx, rx) = mpsc::channel(capacity);
    Ok((
        QueueSender { inner: tx },
        QueueReceiver {
            inner: Arc::new(Mutex::new(rx)),
        },
    ))
}

pub type WorkSender = QueueSender<ClipTask>;
pub type WorkReceiver = QueueReceiver<ClipTask>;
pub type FailureSender = QueueSender<FailureRecord>;
pub type FailureReceiver = QueueReceiver<FailureRecord>;

/// Queue of tasks from the expander to the workers.
pub fn work_queue(capacity: usize) -> QueueResult<(WorkSender, WorkReceiver)> {
    bounded(capacity)
}

/// Queue of failure records from the workers to the sink.
pub fn failure_queue(capacity: usize) -> QueueResult<(FailureSender, FailureReceiver)> {
    bounded(capacity)
}
