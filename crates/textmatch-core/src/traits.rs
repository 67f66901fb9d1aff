use crate::types::{IndexReceipt, Provisioned, SearchHit, UnitId, UnitSchema, UnitSource};

/// The external full-text index the service stores units in.
///
/// Calls may block. Implementations signal transient failures by returning
/// `crate::error::Error::BackendUnavailable` inside the `anyhow::Error` so callers
/// know the call is worth retrying.
pub trait UnitIndex: Send + Sync {
    /// Liveness check, used once at startup.
    fn ping(&self) -> bool;

    /// Create the named index if missing. Idempotent.
    fn ensure_index(&self, name: &str, schema: &UnitSchema) -> anyhow::Result<Provisioned>;

    /// Persist one unit. `id` is generated when `None`.
    fn index(&self, name: &str, id: Option<&str>, source: &UnitSource) -> anyhow::Result<IndexReceipt>;

    /// Persist several units in one write. All or nothing: on error none of
    /// them are stored. Receipts follow the input order.
    fn index_batch(&self, name: &str, units: &[(UnitId, UnitSource)]) -> anyhow::Result<Vec<IndexReceipt>>;

    /// Units whose `field` matches `term` per the engine's analyzer, at most `limit`.
    fn match_query(&self, name: &str, field: &str, term: &str, limit: usize) -> anyhow::Result<Vec<SearchHit>>;
}
