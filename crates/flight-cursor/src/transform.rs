use crate::Error;
use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;

/// BatchTransform reconciles per-endpoint batch schemas into the canonical
/// schema of the whole result, as an explicit fold over exposed batches.
///
/// `accumulator` is the batch previously exposed by the cursor, or `None` for
/// the very first batch of the execution — the call which fixes the canonical
/// schema. The fold runs on the consumer side, so implementations are never
/// invoked concurrently for one cursor.
pub trait BatchTransform: Send + Sync {
    fn reconcile(
        &self,
        accumulator: Option<&RecordBatch>,
        incoming: RecordBatch,
    ) -> crate::Result<RecordBatch>;
}

/// SchemaProjection reconciles by projecting each incoming batch onto a
/// canonical schema, matching columns by field name and dropping columns the
/// canonical schema doesn't carry. A canonical field missing from the
/// incoming batch is a reconciliation failure.
pub struct SchemaProjection {
    canonical: SchemaRef,
}

impl SchemaProjection {
    pub fn new(canonical: SchemaRef) -> Self {
        Self { canonical }
    }
}

impl BatchTransform for SchemaProjection {
    fn reconcile(
        &self,
        _accumulator: Option<&RecordBatch>,
        incoming: RecordBatch,
    ) -> crate::Result<RecordBatch> {
        let incoming_schema = incoming.schema();

        let indices = self
            .canonical
            .fields()
            .iter()
            .map(|field| incoming_schema.index_of(field.name()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::Transform)?;

        let projected = incoming.project(&indices).map_err(Error::Transform)?;

        // Re-stamp with the canonical schema so batch equality of schemas
        // holds downstream, including schema-level metadata.
        RecordBatch::try_new(self.canonical.clone(), projected.columns().to_vec())
            .map_err(Error::Transform)
    }
}
