use crate::StreamQueue;
use arrow_array::RecordBatch;
use std::collections::VecDeque;
use std::time::Duration;

/// BatchSource is the capability a cursor iterates: a tagged variant over
/// the concrete kinds of batch suppliers in the driver.
///
/// `Stream` is the network-backed multiplexer of a live query execution;
/// `Batches` holds an already-materialized result, the kind produced by
/// metadata-style calls that never touch an endpoint stream.
pub enum BatchSource {
    Stream(StreamQueue),
    Batches(VecDeque<RecordBatch>),
}

impl BatchSource {
    pub async fn next(
        &mut self,
        timeout: Option<Duration>,
    ) -> crate::Result<Option<RecordBatch>> {
        match self {
            BatchSource::Stream(queue) => queue.next(timeout).await,
            // An in-memory source is always ready: the timeout cannot lapse.
            BatchSource::Batches(batches) => Ok(batches.pop_front()),
        }
    }

    pub async fn close(&mut self) {
        match self {
            BatchSource::Stream(queue) => queue.close().await,
            BatchSource::Batches(batches) => batches.clear(),
        }
    }
}
