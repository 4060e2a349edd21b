use crate::client::{Endpoint, QueryClient};
use crate::handoff;
use crate::{reader, Error};
use arrow_array::RecordBatch;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// StreamQueue multiplexes the batch streams of one query execution.
///
/// It owns one reader task per endpoint, all feeding a single bounded
/// hand-off buffer, and surfaces "the next ready batch" to the cursor.
/// Ordering is first-ready-wins across endpoints — a deliberate relaxation
/// traded for throughput — while batches of a single endpoint are always
/// observed in decode order.
pub struct StreamQueue {
    consumer: handoff::Consumer<crate::Result<RecordBatch>>,
    // Task arena, one handle per endpoint, joined on close.
    readers: Vec<(String, JoinHandle<()>)>,
    cancel: CancellationToken,
    closed: bool,
}

impl StreamQueue {
    /// Default bound on batches buffered ahead of the cursor.
    pub const DEFAULT_CAPACITY: usize = handoff::DEFAULT_CAPACITY;

    /// Spawn one reader per endpoint onto a worker pool bounded at
    /// `concurrency` concurrently-open streams, buffering at most
    /// `capacity` batches ahead of the consumer.
    pub fn spawn(
        client: Arc<dyn QueryClient>,
        endpoints: Vec<Endpoint>,
        capacity: usize,
        concurrency: usize,
    ) -> Self {
        let (tx, consumer) = handoff::channel(capacity);
        let cancel = CancellationToken::new();
        let pool = Arc::new(Semaphore::new(concurrency.max(1)));

        let readers = endpoints
            .into_iter()
            .map(|endpoint| {
                let locator = endpoint.locator.clone();
                let handle = tokio::spawn(reader::read_endpoint(
                    client.clone(),
                    endpoint,
                    tx.clone(),
                    pool.clone(),
                    cancel.child_token(),
                ));
                (locator, handle)
            })
            .collect();

        // `tx` drops here: once every reader is done, so is the queue.
        // With zero endpoints that's immediately end-of-data, not a hang.
        Self {
            consumer,
            readers,
            cancel,
            closed: false,
        }
    }

    /// Return the next ready batch across all endpoints, `Ok(None)` once
    /// every endpoint has been fully consumed. With a timeout, an idle
    /// window surfaces `Error::Timeout` — distinct from end-of-data, and
    /// safe to retry.
    pub async fn next(&mut self, timeout: Option<Duration>) -> crate::Result<Option<RecordBatch>> {
        if self.closed {
            return Err(Error::Cancelled);
        }

        let item = match timeout {
            Some(timeout) => self
                .consumer
                .try_take_for(timeout)
                .await
                .map_err(|_| Error::Timeout(timeout))?,
            None => self.consumer.take().await,
        };

        item.transpose()
    }

    /// Tear down every reader. Idempotent and safe to call when already
    /// closed; readers unwind through their stream-release path before this
    /// returns, so no network resource outlives the call.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.cancel.cancel();
        self.consumer.close();

        let (locators, handles): (Vec<_>, Vec<_>) = self.readers.drain(..).unzip();
        for (locator, joined) in locators.iter().zip(futures::future::join_all(handles).await) {
            if let Err(err) = joined {
                if err.is_panic() {
                    tracing::error!(endpoint = %locator, %err, "endpoint reader panicked");
                }
            }
        }
    }
}

impl Drop for StreamQueue {
    fn drop(&mut self) {
        // Best-effort: a queue dropped without close still interrupts its
        // readers, which release their streams as they unwind.
        self.cancel.cancel();
    }
}
