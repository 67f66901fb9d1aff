use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

use textmatch_core::error::{Error, Result};
use textmatch_core::splitter::split_terms;
use textmatch_core::traits::UnitIndex;
use textmatch_core::types::{MatchesByTerm, Unit};

use crate::retry::RetryPolicy;

/// Pass-through match queries with response shaping. Matching itself is the index's.
pub struct QueryEngine {
    index: Arc<dyn UnitIndex>,
    index_name: String,
    text_field: String,
    retry: RetryPolicy,
    default_limit: usize,
    max_limit: usize,
    concurrency: usize,
}

impl QueryEngine {
    pub fn new(index: Arc<dyn UnitIndex>, index_name: impl Into<String>, text_field: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            index,
            index_name: index_name.into(),
            text_field: text_field.into(),
            retry,
            default_limit: 10,
            max_limit: 100,
            concurrency: 8,
        }
    }

    pub fn with_limits(mut self, default_limit: usize, max_limit: usize) -> Self {
        self.default_limit = default_limit.max(1);
        self.max_limit = max_limit.max(self.default_limit);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn query(&self, term: &str) -> Result<Vec<Unit>> {
        self.query_with_limit(term, None).await
    }

    /// Exactly one match call. An empty vector means no match, not an error.
    pub async fn query_with_limit(&self, term: &str, limit: Option<usize>) -> Result<Vec<Unit>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(Error::validation("query term is required"));
        }
        let limit = limit.unwrap_or(self.default_limit).clamp(1, self.max_limit);
        match self.match_units(term.to_string(), limit).await {
            Ok(units) => {
                tracing::info!(index = %self.index_name, term, matches = units.len(), "search");
                Ok(units)
            }
            Err(err) => {
                tracing::error!(index = %self.index_name, term, error = %err, "search failed");
                Err(err)
            }
        }
    }

    /// One query per distinct lower-cased token, run concurrently and joined.
    ///
    /// Terms without matches are left out of the map. A term whose query fails
    /// counts as no match; only when every term fails is the error returned.
    pub async fn query_paragraph(&self, paragraph: &str) -> Result<MatchesByTerm> {
        if paragraph.trim().is_empty() {
            return Err(Error::validation("paragraph is required"));
        }
        let mut seen = HashSet::new();
        let terms: Vec<String> = split_terms(paragraph).into_iter().filter(|t| seen.insert(t.clone())).collect();
        let queried = terms.len();

        let outcomes: Vec<(String, Result<Vec<Unit>>)> = stream::iter(terms)
            .map(|term| async move {
                let outcome = self.match_units(term.clone(), self.default_limit).await;
                (term, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut matches = MatchesByTerm::new();
        let mut failures = Vec::new();
        for (term, outcome) in outcomes {
            match outcome {
                Ok(units) if units.is_empty() => {}
                Ok(units) => {
                    matches.insert(term, units);
                }
                Err(err) => {
                    tracing::warn!(index = %self.index_name, term = %term, error = %err, "term query failed, treating as no match");
                    failures.push(err);
                }
            }
        }

        if failures.len() == queried {
            if let Some(err) = failures.into_iter().next() {
                return Err(err);
            }
        }
        tracing::info!(index = %self.index_name, terms = queried, matched = matches.len(), "paragraph search");
        Ok(matches)
    }

    async fn match_units(&self, term: String, limit: usize) -> Result<Vec<Unit>> {
        let index = Arc::clone(&self.index);
        let name = self.index_name.clone();
        let field = self.text_field.clone();
        let hits = self.retry.run("match", move || index.match_query(&name, &field, &term, limit)).await?;
        Ok(hits.into_iter().map(Unit::from).collect())
    }
}
