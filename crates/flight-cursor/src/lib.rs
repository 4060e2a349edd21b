mod client;
pub use client::{Endpoint, EndpointStream, QueryClient, QueryDescriptor};

mod transform;
pub use transform::{BatchTransform, SchemaProjection};

mod handoff;

mod reader;

mod queue;
pub use queue::StreamQueue;

mod source;
pub use source::BatchSource;

mod cursor;
pub use cursor::{Cursor, CursorOptions, State};

/// BoxError is the generic error wrapped by collaborator-produced variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to resolve endpoints for query")]
    Execute(#[source] BoxError),
    #[error("failed to open stream for endpoint '{locator}'")]
    Connect {
        locator: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to decode batch from endpoint stream")]
    Decode(#[source] BoxError),
    #[error("failed to reconcile batch against the canonical schema")]
    Transform(#[source] arrow_schema::ArrowError),
    #[error("batch schema does not match the canonical result schema")]
    SchemaMismatch,
    #[error("timed out after {0:?} waiting for the next batch")]
    Timeout(std::time::Duration),
    #[error("cursor was cancelled")]
    Cancelled,
    #[error("cursor is closed")]
    Closed,
    #[error("failed to release an endpoint stream")]
    Resource(#[source] BoxError),
    #[error("{0}")]
    Protocol(&'static str),
}

impl Error {
    /// Timeouts are the one recoverable condition: the caller may simply
    /// retry the call that surfaced them. Everything else is terminal for
    /// the reader or the cursor that produced it.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
