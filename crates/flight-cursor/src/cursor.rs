use crate::client::{QueryClient, QueryDescriptor};
use crate::source::BatchSource;
use crate::transform::BatchTransform;
use crate::{Error, StreamQueue};
use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use std::sync::Arc;
use std::time::Duration;

/// State of a [`Cursor`]. Exactly one batch is current while `HasCurrent`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    Idle,
    Executing,
    HasCurrent,
    Exhausted,
    Cancelled,
    Closed,
}

/// Per-execution configuration of a [`Cursor`].
#[derive(Clone, Debug)]
pub struct CursorOptions {
    /// Batches buffered ahead of the consumer, bounding memory.
    pub buffer_capacity: usize,
    /// Endpoint streams open concurrently.
    pub concurrency: usize,
    /// How long a single `next()` may wait for a batch.
    /// `Duration::ZERO` means wait indefinitely.
    pub call_timeout: Duration,
    /// Cap on total rows yielded. Zero means unlimited.
    pub max_rows: u64,
    /// Whether the enclosing statement wants to be closed once the cursor
    /// completes. Surfaced read-only for the statement adapter; the cursor
    /// itself only tears down its own resources.
    pub close_on_completion: bool,
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: StreamQueue::DEFAULT_CAPACITY,
            concurrency: 8,
            call_timeout: Duration::ZERO,
            max_rows: 0,
            close_on_completion: false,
        }
    }
}

/// Cursor drives one query execution: it resolves the query into endpoints,
/// multiplexes their streams through a [`StreamQueue`], and exposes the
/// result one batch at a time to a single logical consumer.
pub struct Cursor {
    client: Option<Arc<dyn QueryClient>>,
    options: CursorOptions,
    transform: Option<Box<dyn BatchTransform>>,
    state: State,
    source: Option<BatchSource>,
    // Canonical schema of the result: announced up front, or fixed by the
    // first exposed batch.
    schema: Option<SchemaRef>,
    current: Option<RecordBatch>,
    rows: u64,
}

impl Cursor {
    pub fn new(client: Arc<dyn QueryClient>, options: CursorOptions) -> Self {
        Self {
            client: Some(client),
            options,
            transform: None,
            state: State::Idle,
            source: None,
            schema: None,
            current: None,
            rows: 0,
        }
    }

    /// Build a cursor over an already-materialized result, the in-memory
    /// [`BatchSource`] kind. Such a cursor needs no `execute()` call.
    pub fn from_batches(
        batches: impl IntoIterator<Item = RecordBatch>,
        options: CursorOptions,
    ) -> Self {
        Self {
            client: None,
            options,
            transform: None,
            state: State::Executing,
            source: Some(BatchSource::Batches(batches.into_iter().collect())),
            schema: None,
            current: None,
            rows: 0,
        }
    }

    /// Reconcile every exposed batch through `transform`.
    pub fn with_transform(mut self, transform: Box<dyn BatchTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Announce the canonical result schema ahead of the first batch,
    /// when query metadata already knows it.
    pub fn with_schema(mut self, schema: SchemaRef) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Resolve `query` into its endpoints and start streaming them.
    ///
    /// A query yielding zero endpoints exhausts the cursor immediately,
    /// without ever spawning a reader.
    pub async fn execute(&mut self, query: &QueryDescriptor) -> crate::Result<()> {
        if self.state != State::Idle {
            return Err(Error::Protocol("cursor was already executed"));
        }
        let client = self
            .client
            .clone()
            .ok_or(Error::Protocol("cursor has no query client"))?;

        let endpoints = client.execute_query(query).await?;
        tracing::debug!(endpoints = endpoints.len(), "resolved query endpoints");

        if endpoints.is_empty() {
            self.state = State::Exhausted;
            return Ok(());
        }

        self.source = Some(BatchSource::Stream(StreamQueue::spawn(
            client,
            endpoints,
            self.options.buffer_capacity,
            self.options.concurrency,
        )));
        self.state = State::Executing;
        Ok(())
    }

    /// Advance to the next batch. `Ok(true)` means a new batch is current;
    /// `Ok(false)` means no more rows.
    ///
    /// An `Error::Timeout` leaves the cursor state untouched and may simply
    /// be retried. Any other error is terminal for the call but leaves the
    /// cursor safe to close.
    pub async fn next(&mut self) -> crate::Result<bool> {
        match self.state {
            State::Idle => Err(Error::Protocol("execute() has not been called")),
            State::Cancelled => Err(Error::Cancelled),
            State::Closed => Err(Error::Closed),
            State::Exhausted => Ok(false),
            State::Executing | State::HasCurrent => self.advance().await,
        }
    }

    async fn advance(&mut self) -> crate::Result<bool> {
        let timeout = match self.options.call_timeout {
            timeout if timeout.is_zero() => None,
            timeout => Some(timeout),
        };
        let Some(source) = self.source.as_mut() else {
            return Err(Error::Protocol("cursor has no batch source"));
        };

        let Some(incoming) = source.next(timeout).await? else {
            self.finish().await;
            return Ok(false);
        };

        // Fold the incoming batch against the previously exposed one,
        // then fix or enforce the canonical schema.
        let batch = match &self.transform {
            Some(transform) => transform.reconcile(self.current.as_ref(), incoming)?,
            None => incoming,
        };
        match &self.schema {
            None => self.schema = Some(batch.schema()),
            Some(canonical) if batch.schema() != *canonical => {
                return Err(Error::SchemaMismatch);
            }
            Some(_) => (),
        }

        let batch_rows = batch.num_rows() as u64;
        if self.options.max_rows != 0 && self.rows + batch_rows > self.options.max_rows {
            // Yielding this batch would overrun the row limit: report
            // completion instead of the batch.
            tracing::debug!(
                yielded = self.rows,
                max_rows = self.options.max_rows,
                "row limit reached"
            );
            self.finish().await;
            return Ok(false);
        }

        // The previous current batch is released here.
        self.current = Some(batch);
        self.rows += batch_rows;
        self.state = State::HasCurrent;
        Ok(true)
    }

    async fn finish(&mut self) {
        self.current = None;
        if let Some(mut source) = self.source.take() {
            source.close().await;
        }
        self.state = State::Exhausted;
    }

    /// The batch exposed by the last successful `next()`.
    pub fn current_batch(&self) -> Option<&RecordBatch> {
        self.current.as_ref()
    }

    /// Canonical schema of the result, once known.
    pub fn schema(&self) -> Option<SchemaRef> {
        self.schema.clone()
    }

    /// Total rows yielded so far.
    pub fn row_count(&self) -> u64 {
        self.rows
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Whether the enclosing statement asked to be closed on completion.
    pub fn close_on_completion(&self) -> bool {
        self.options.close_on_completion
    }

    /// Cancel the execution, tearing down every endpoint reader. Idempotent;
    /// every subsequent `next()` fails with `Error::Cancelled`.
    pub async fn cancel(&mut self) {
        if matches!(self.state, State::Cancelled | State::Closed) {
            return;
        }
        self.teardown().await;
        self.state = State::Cancelled;
    }

    /// Close the cursor and release all resources. Idempotent, callable from
    /// any state including `Cancelled`, and never double-releases.
    pub async fn close(&mut self) {
        if self.state == State::Closed {
            return;
        }
        self.teardown().await;
        self.state = State::Closed;
    }

    async fn teardown(&mut self) {
        self.current = None;
        if let Some(mut source) = self.source.take() {
            source.close().await;
        }
    }
}
