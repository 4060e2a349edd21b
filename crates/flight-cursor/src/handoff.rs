use std::time::Duration;
use tokio::sync::mpsc;

/// Default bound on batches held between the endpoint readers and the cursor.
pub(crate) const DEFAULT_CAPACITY: usize = 5;

/// Build the bounded hand-off buffer decoupling endpoint readers (producers)
/// from the consuming cursor. Holds at most `capacity` items at any instant,
/// which is what bounds the memory of an execution regardless of how fast
/// the server streams. `capacity` is clamped to at least one slot.
pub(crate) fn channel<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Producer { tx }, Consumer { rx })
}

/// Producing half, cloned into each reader task. Dropping every clone is the
/// end-of-data signal observed by [`Consumer::take`].
pub(crate) struct Producer<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> Producer<T> {
    /// Deposit one item, suspending while the buffer is full.
    /// Returns the item back once the consumer has closed the buffer.
    pub async fn put(&self, item: T) -> Result<(), T> {
        self.tx.send(item).await.map_err(|err| err.0)
    }
}

/// Consuming half, held by exactly one cursor.
pub(crate) struct Consumer<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> Consumer<T> {
    /// Take the next item, suspending while the buffer is empty.
    /// `None` means every producer has finished: end-of-data.
    pub async fn take(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// As `take`, but give up after `timeout`. The error is distinct from
    /// end-of-data: the buffer is still live and the call may be retried.
    pub async fn try_take_for(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<T>, tokio::time::error::Elapsed> {
        tokio::time::timeout(timeout, self.rx.recv()).await
    }

    /// Close the buffer: wakes every blocked producer, whose subsequent
    /// `put` calls fail fast. Items already buffered remain takeable.
    /// Idempotent.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
