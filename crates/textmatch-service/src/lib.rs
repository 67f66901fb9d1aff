//! textmatch-service
//!
//! Ingestion and query components over an injected `UnitIndex`, plus the
//! startup provisioning step. Every backend call goes through `RetryPolicy`.

pub mod ingest;
pub mod provision;
pub mod query;
pub mod retry;

use std::sync::Arc;

use textmatch_core::config::Settings;
use textmatch_core::error::Result;
use textmatch_core::traits::UnitIndex;
use textmatch_core::types::{IngestReport, IngestRequest, MatchesByTerm, Provisioned, Unit, UnitSchema};

pub use ingest::Ingestor;
pub use query::QueryEngine;
pub use retry::RetryPolicy;

/// The service facade: one ingestion and one query component sharing a backend handle.
pub struct TextMatchService {
    index: Arc<dyn UnitIndex>,
    index_name: String,
    schema: UnitSchema,
    retry: RetryPolicy,
    ingestor: Ingestor,
    queries: QueryEngine,
}

impl TextMatchService {
    pub fn new(index: Arc<dyn UnitIndex>, settings: &Settings) -> Self {
        let schema = UnitSchema::default();
        let retry = RetryPolicy::from(&settings.backend);
        let index_name = settings.index.name.clone();
        let ingestor = Ingestor::new(Arc::clone(&index), index_name.clone(), retry.clone(), settings.backend.concurrency)
            .with_batch_size(settings.backend.batch_size);
        let queries = QueryEngine::new(Arc::clone(&index), index_name.clone(), schema.text_field.clone(), retry.clone())
            .with_limits(settings.search.default_limit, settings.search.max_limit)
            .with_concurrency(settings.backend.concurrency);
        Self { index, index_name, schema, retry, ingestor, queries }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Run once before serving: ping, ensure the index, and seed it when it was
    /// just created. Every failure is fatal to startup.
    pub async fn provision(&self, seed_documents: &[String]) -> Result<Provisioned> {
        provision::ping(&self.index, &self.retry).await?;
        let provisioned = provision::ensure_index(&self.index, &self.index_name, &self.schema, &self.retry).await?;
        tracing::info!(index = %self.index_name, ?provisioned, "index ready");

        if provisioned == Provisioned::Created && !seed_documents.is_empty() {
            for (n, text) in (1u64..).zip(seed_documents) {
                let request = IngestRequest { id: Some(n.to_string()), ..IngestRequest::document(text.as_str()).with_paragraph(n) };
                self.ingestor.ingest(request).await?;
            }
            tracing::info!(index = %self.index_name, documents = seed_documents.len(), "inserted seed documents");
        }
        Ok(provisioned)
    }

    pub async fn health(&self) -> bool {
        provision::ping(&self.index, &self.retry).await.is_ok()
    }

    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReport> {
        self.ingestor.ingest(request).await
    }

    pub async fn query(&self, term: &str) -> Result<Vec<Unit>> {
        self.queries.query(term).await
    }

    pub async fn query_with_limit(&self, term: &str, limit: Option<usize>) -> Result<Vec<Unit>> {
        self.queries.query_with_limit(term, limit).await
    }

    pub async fn query_paragraph(&self, paragraph: &str) -> Result<MatchesByTerm> {
        self.queries.query_paragraph(paragraph).await
    }
}
