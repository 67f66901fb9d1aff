use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use textmatch_core::error::{Error, Result};
use textmatch_core::splitter::split_lines;
use textmatch_core::traits::UnitIndex;
use textmatch_core::types::{IndexReceipt, IngestMode, IngestReport, IngestRequest, IngestStatus, Sequence, UnitId, UnitSource};

use crate::retry::RetryPolicy;

type Keyed = (UnitId, UnitSource);

/// Turns one submission into units and writes them to the index.
pub struct Ingestor {
    index: Arc<dyn UnitIndex>,
    index_name: String,
    retry: RetryPolicy,
    concurrency: usize,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(index: Arc<dyn UnitIndex>, index_name: impl Into<String>, retry: RetryPolicy, concurrency: usize) -> Self {
        Self { index, index_name: index_name.into(), retry, concurrency: concurrency.max(1), batch_size: 256 }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Validation runs before any backend call. Ids are fixed up front so a
    /// retried write can recognise its own earlier attempt. Batches are written
    /// with bounded concurrency; the report keeps sequence order.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReport> {
        let units: Vec<Keyed> = derive_units(&request)?
            .into_iter()
            .map(|(id, source)| (id.unwrap_or_else(|| Uuid::new_v4().to_string()), source))
            .collect();
        let total = units.len();

        let batches: Vec<Vec<Keyed>> = units.chunks(self.batch_size).map(<[Keyed]>::to_vec).collect();
        let outcomes: Vec<Result<IndexReceipt>> = stream::iter(batches)
            .map(|batch| self.write_batch(batch))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        let mut ids = Vec::with_capacity(total);
        let mut result = None;
        let mut first_error = None;
        for (position, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(receipt) => {
                    ids.push(receipt.id);
                    result = Some(receipt.result);
                }
                Err(err) => {
                    tracing::error!(index = %self.index_name, unit = position + 1, error = %err, "failed to index unit");
                    first_error.get_or_insert(err);
                }
            }
        }

        let indexed = ids.len();
        let failed = total - indexed;
        if indexed == 0 {
            // Validation guarantees at least one unit, so a failure was recorded.
            return Err(first_error.unwrap_or_else(|| Error::Operation("no units indexed".into())));
        }
        let status = if failed == 0 { IngestStatus::Complete } else { IngestStatus::Partial };
        tracing::info!(
            index = %self.index_name,
            total,
            indexed,
            failed,
            preview = %preview(&request.text),
            "ingested submission"
        );
        Ok(IngestReport { status, total, indexed, failed, ids, result: if total == 1 { result } else { None } })
    }

    /// One outcome per unit of `batch`. A batch rejected for a reason other
    /// than unavailability is retried unit by unit to isolate the bad ones.
    async fn write_batch(&self, mut batch: Vec<Keyed>) -> Vec<Result<IndexReceipt>> {
        if batch.len() == 1 {
            if let Some((id, source)) = batch.pop() {
                return vec![self.write_unit(id, source).await];
            }
        }

        let units = Arc::new(batch);
        let index = Arc::clone(&self.index);
        let name = self.index_name.clone();
        let attempts = Arc::new(WriteAttempts::default());
        let shared = Arc::clone(&units);
        let written = self
            .retry
            .run("index_batch", move || {
                let attempt = attempts.begin();
                let outcome = index.index_batch(&name, &shared);
                attempts.settle(attempt, outcome, || shared.iter().map(|(id, _)| IndexReceipt::created(id.clone())).collect())
            })
            .await;

        match written {
            Ok(receipts) => receipts.into_iter().map(Ok).collect(),
            Err(err) if err.is_transient() => units.iter().map(|_| Err(err.clone())).collect(),
            Err(err) => {
                tracing::warn!(index = %self.index_name, units = units.len(), error = %err, "batch rejected, indexing units one by one");
                let mut outcomes = Vec::with_capacity(units.len());
                for (id, source) in units.iter().cloned() {
                    outcomes.push(self.write_unit(id, source).await);
                }
                outcomes
            }
        }
    }

    async fn write_unit(&self, id: UnitId, source: UnitSource) -> Result<IndexReceipt> {
        let index = Arc::clone(&self.index);
        let name = self.index_name.clone();
        let attempts = Arc::new(WriteAttempts::default());
        self.retry
            .run("index", move || {
                let attempt = attempts.begin();
                let outcome = index.index(&name, Some(id.as_str()), &source);
                attempts.settle(attempt, outcome, || IndexReceipt::created(id.clone()))
            })
            .await
    }
}

/// Attempt bookkeeping for one write across retries.
///
/// A timed-out attempt keeps running on the blocking pool and may still commit.
/// When a later attempt then hits `DuplicateId` for the same ids, the earlier
/// write landed and counts as this write's success. If every earlier attempt
/// came back with an error, the duplicate is real.
#[derive(Default)]
struct WriteAttempts {
    started: AtomicU32,
    failed: AtomicU32,
}

impl WriteAttempts {
    fn begin(&self) -> u32 {
        self.started.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn settle<T>(&self, attempt: u32, outcome: anyhow::Result<T>, landed: impl FnOnce() -> T) -> anyhow::Result<T> {
        match outcome {
            Ok(value) => Ok(value),
            Err(err) if attempt > 1 && is_duplicate(&err) && self.failed.load(Ordering::SeqCst) < attempt - 1 => {
                tracing::info!(attempt, "earlier timed-out write landed, keeping it");
                Ok(landed())
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                Err(err)
            }
        }
    }
}

fn is_duplicate(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<Error>(), Some(Error::DuplicateId(_)))
}

/// Split a submission into `(id, source)` pairs. Lines are numbered from 1 and
/// kept verbatim, including blank ones.
pub fn derive_units(request: &IngestRequest) -> Result<Vec<(Option<UnitId>, UnitSource)>> {
    if request.text.trim().is_empty() {
        return Err(Error::validation("text field is required"));
    }
    if request.paragraph_number == Some(0) {
        return Err(Error::validation("paragraph_number must be at least 1"));
    }
    if request.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
        return Err(Error::validation("id must not be blank"));
    }

    let paragraph_number = request.paragraph_number;
    let units = match request.mode {
        IngestMode::Lines => split_lines(&request.text)
            .into_iter()
            .zip(1u64..)
            .map(|(line, line_number)| {
                let id = request.id.as_ref().map(|id| format!("{}:{}", id, line_number));
                let sequence = Sequence { line_number: Some(line_number), paragraph_number };
                (id, UnitSource { sequence: Some(sequence), text: line.to_string() })
            })
            .collect(),
        IngestMode::Document => {
            let sequence = Sequence { line_number: None, paragraph_number }.non_empty();
            vec![(request.id.clone(), UnitSource { sequence, text: request.text.trim().to_string() })]
        }
    };
    Ok(units)
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(50).collect();
    if preview.len() < text.len() { preview.push_str("..."); }
    preview
}
