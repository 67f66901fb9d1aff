#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use textmatch_core::config::Settings;
use textmatch_core::error::Error;
use textmatch_core::traits::UnitIndex;
use textmatch_core::types::{IndexReceipt, Provisioned, SearchHit, UnitId, UnitSchema, UnitSource};
use textmatch_service::TextMatchService;

/// In-memory `UnitIndex` that counts calls and injects failures.
///
/// Matching: lower-cased alphanumeric tokens, any shared token matches.
#[derive(Default)]
pub struct RecordingIndex {
    units: Mutex<Vec<(String, UnitSource)>>,
    created: Mutex<HashSet<String>>,
    next_id: AtomicUsize,
    pub ping_calls: AtomicUsize,
    pub ensure_calls: AtomicUsize,
    pub index_calls: AtomicUsize,
    pub match_calls: AtomicUsize,
    pub ping_down: AtomicBool,
    /// Remaining calls to `index`/`match_query` that fail as unavailable.
    pub unavailable_for: AtomicUsize,
    /// Remaining writes that store their units, then stall past the call timeout.
    pub stalled_writes: AtomicUsize,
    failing_texts: Mutex<HashSet<String>>,
    slow_terms: Mutex<HashSet<String>>,
}

impl RecordingIndex {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_text(&self, text: &str) {
        self.failing_texts.lock().expect("lock").insert(text.to_string());
    }

    pub fn slow_term(&self, term: &str) {
        self.slow_terms.lock().expect("lock").insert(term.to_string());
    }

    pub fn stored(&self) -> Vec<(String, UnitSource)> {
        self.units.lock().expect("lock").clone()
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn take_outage(&self) -> bool {
        take_one(&self.unavailable_for)
    }

    fn stall_if_asked(&self) {
        if take_one(&self.stalled_writes) {
            std::thread::sleep(Duration::from_millis(250));
        }
    }

    fn rejects(&self, text: &str) -> bool {
        self.failing_texts.lock().expect("lock").contains(text)
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
}

fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

impl UnitIndex for RecordingIndex {
    fn ping(&self) -> bool {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        !self.ping_down.load(Ordering::SeqCst)
    }

    fn ensure_index(&self, name: &str, _schema: &UnitSchema) -> anyhow::Result<Provisioned> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        let created = self.created.lock().expect("lock").insert(name.to_string());
        Ok(if created { Provisioned::Created } else { Provisioned::AlreadyPresent })
    }

    fn index(&self, _name: &str, id: Option<&str>, source: &UnitSource) -> anyhow::Result<IndexReceipt> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_outage() {
            return Err(Error::BackendUnavailable("connection refused".into()).into());
        }
        if self.rejects(&source.text) {
            return Err(Error::Backend("document rejected".into()).into());
        }
        let mut units = self.units.lock().expect("lock");
        let id = match id {
            Some(id) if units.iter().any(|(existing, _)| existing == id) => return Err(Error::DuplicateId(id.to_string()).into()),
            Some(id) => id.to_string(),
            None => format!("u{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
        };
        units.push((id.clone(), source.clone()));
        drop(units);
        self.stall_if_asked();
        Ok(IndexReceipt::created(id))
    }

    fn index_batch(&self, _name: &str, batch: &[(UnitId, UnitSource)]) -> anyhow::Result<Vec<IndexReceipt>> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_outage() {
            return Err(Error::BackendUnavailable("connection refused".into()).into());
        }
        if batch.iter().any(|(_, source)| self.rejects(&source.text)) {
            return Err(Error::Backend("document rejected".into()).into());
        }
        let mut units = self.units.lock().expect("lock");
        if let Some((id, _)) = batch.iter().find(|(id, _)| units.iter().any(|(existing, _)| existing == id)) {
            return Err(Error::DuplicateId(id.clone()).into());
        }
        units.extend(batch.iter().cloned());
        drop(units);
        self.stall_if_asked();
        Ok(batch.iter().map(|(id, _)| IndexReceipt::created(id.clone())).collect())
    }

    fn match_query(&self, _name: &str, field: &str, term: &str, limit: usize) -> anyhow::Result<Vec<SearchHit>> {
        self.match_calls.fetch_add(1, Ordering::SeqCst);
        if field != "text" {
            anyhow::bail!("unknown field {field}");
        }
        if self.slow_terms.lock().expect("lock").contains(term) {
            std::thread::sleep(Duration::from_millis(300));
        }
        if self.take_outage() {
            return Err(Error::BackendUnavailable("connection refused".into()).into());
        }
        let wanted = tokens(term);
        let units = self.units.lock().expect("lock");
        Ok(units
            .iter()
            .filter(|(_, source)| !tokens(&source.text).is_disjoint(&wanted))
            .take(limit)
            .map(|(id, source)| SearchHit { id: id.clone(), score: 1.0, source: source.clone() })
            .collect())
    }
}

/// Settings with a short timeout and near-zero backoff for fast tests.
pub fn fast_settings() -> Settings {
    let mut settings = Settings::default();
    settings.backend.timeout_ms = 100;
    settings.backend.backoff_ms = 1;
    settings.backend.max_backoff_ms = 2;
    settings
}

pub async fn provisioned_service(index: &Arc<RecordingIndex>, settings: &Settings) -> TextMatchService {
    let backend: Arc<dyn UnitIndex> = index.clone();
    let service = TextMatchService::new(backend, settings);
    service.provision(&[]).await.expect("provision");
    service
}
