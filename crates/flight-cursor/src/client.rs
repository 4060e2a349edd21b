use arrow_array::RecordBatch;

/// Endpoint locates one partition of a query's result set.
///
/// Endpoints are produced by the query-planning collaborator and consumed
/// exactly once: a single reader opens a single stream per Endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Endpoint {
    /// Opaque locator of the server holding this partition.
    pub locator: String,
    /// Optional retrieval ticket to present when opening the stream.
    pub ticket: Option<bytes::Bytes>,
}

impl Endpoint {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            ticket: None,
        }
    }

    pub fn with_ticket(mut self, ticket: bytes::Bytes) -> Self {
        self.ticket = Some(ticket);
        self
    }
}

/// QueryDescriptor is the opaque query handed to [`QueryClient::execute_query`].
/// The core does no planning or parsing of its content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryDescriptor {
    pub query: String,
}

impl QueryDescriptor {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// QueryClient is the query-execution collaborator: it plans a query into
/// result endpoints, and opens a decoded batch stream for each one.
#[async_trait::async_trait]
pub trait QueryClient: Send + Sync + 'static {
    /// Execute `query` and return the endpoints serving its result,
    /// which may be empty for a query producing no rows.
    async fn execute_query(&self, query: &QueryDescriptor) -> crate::Result<Vec<Endpoint>>;

    /// Open the batch stream of one `endpoint`.
    async fn open_stream(&self, endpoint: &Endpoint) -> crate::Result<Box<dyn EndpointStream>>;
}

/// EndpointStream is one open network stream of decoded record batches.
///
/// `next_batch` returns batches in server order and `Ok(None)` at end-of-data.
/// `close` releases the underlying network resource and must be safe to call
/// after `next_batch` has returned `Ok(None)` or an error.
#[async_trait::async_trait]
pub trait EndpointStream: Send {
    async fn next_batch(&mut self) -> crate::Result<Option<RecordBatch>>;

    async fn close(&mut self) -> crate::Result<()>;
}
