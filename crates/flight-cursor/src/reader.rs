use crate::client::{Endpoint, EndpointStream, QueryClient};
use crate::handoff::Producer;
use arrow_array::RecordBatch;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Read one endpoint's stream to completion, depositing each decoded batch
/// into the shared hand-off buffer in decode order.
///
/// Every exit path releases the network stream exactly once, including
/// cooperative cancellation and the consumer closing the buffer under us.
/// A terminal decode failure travels through the buffer as an item, so the
/// consumer observes it rather than waiting forever.
pub(crate) async fn read_endpoint(
    client: Arc<dyn QueryClient>,
    endpoint: Endpoint,
    tx: Producer<crate::Result<RecordBatch>>,
    pool: Arc<Semaphore>,
    cancel: CancellationToken,
) {
    // Wait for a worker slot of the bounded pool shared by this execution.
    let _permit = tokio::select! {
        permit = pool.acquire_owned() => match permit {
            Ok(permit) => permit,
            // The pool is never closed while readers run.
            Err(_) => return,
        },
        () = cancel.cancelled() => return,
    };

    let mut stream = tokio::select! {
        opened = client.open_stream(&endpoint) => match opened {
            Ok(stream) => stream,
            Err(err) => {
                let _ = tx.put(Err(err)).await;
                return;
            }
        },
        () = cancel.cancelled() => return,
    };

    if let Err(err) = read_loop(stream.as_mut(), &tx, &cancel).await {
        // Forward the failure to the consumer. If the buffer is already
        // closed the cursor is tearing down and no longer cares.
        let _ = tx.put(Err(err)).await;
    }

    if let Err(err) = stream.close().await {
        tracing::warn!(endpoint = %endpoint.locator, %err, "failed to release endpoint stream");
    } else {
        tracing::trace!(endpoint = %endpoint.locator, "endpoint stream released");
    }
}

async fn read_loop(
    stream: &mut dyn EndpointStream,
    tx: &Producer<crate::Result<RecordBatch>>,
    cancel: &CancellationToken,
) -> crate::Result<()> {
    loop {
        let batch = tokio::select! {
            batch = stream.next_batch() => batch?,
            () = cancel.cancelled() => return Ok(()),
        };

        let Some(batch) = batch else {
            return Ok(()); // End-of-data for this endpoint.
        };

        if tx.put(Ok(batch)).await.is_err() {
            return Ok(()); // Consumer closed the buffer.
        }
    }
}
