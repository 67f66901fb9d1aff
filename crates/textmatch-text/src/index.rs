use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tantivy::collector::Count;
use tantivy::directory::MmapDirectory;
use tantivy::query::TermQuery;
use tantivy::schema::IndexRecordOption;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use uuid::Uuid;

use textmatch_core::config::IndexSettings;
use textmatch_core::error::Error;
use textmatch_core::traits::UnitIndex;
use textmatch_core::types::{IndexReceipt, Provisioned, SearchHit, UnitId, UnitSchema, UnitSource};

use crate::tantivy_utils::{build_schema, register_tokenizer, UnitFields};

const DEFAULT_WRITER_MEMORY: usize = 50_000_000;

/// One open index: a single writer, a manually reloaded reader.
pub(crate) struct IndexHandle {
	pub(crate) index: Index,
	pub(crate) reader: IndexReader,
	pub(crate) fields: UnitFields,
	writer: Mutex<IndexWriter>,
}

/// Tantivy-backed `UnitIndex`. Each named index lives in `<root>/<name>`, or in RAM
/// when no root is given.
pub struct TantivyUnitIndex {
	root: Option<PathBuf>,
	writer_memory_bytes: usize,
	indexes: RwLock<HashMap<String, Arc<IndexHandle>>>,
}

impl TantivyUnitIndex {
	pub fn in_memory() -> Self {
		Self { root: None, writer_memory_bytes: DEFAULT_WRITER_MEMORY, indexes: RwLock::new(HashMap::new()) }
	}

	pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
		let root = root.into();
		std::fs::create_dir_all(&root)?;
		Ok(Self { root: Some(root), writer_memory_bytes: DEFAULT_WRITER_MEMORY, indexes: RwLock::new(HashMap::new()) })
	}

	pub fn from_settings(settings: &IndexSettings) -> Result<Self> {
		let backend = match settings.dir_path() {
			Some(root) => Self::open(root)?,
			None => Self::in_memory(),
		};
		Ok(backend.with_writer_memory(settings.writer_memory_bytes))
	}

	pub fn with_writer_memory(mut self, bytes: usize) -> Self {
		self.writer_memory_bytes = bytes;
		self
	}

	pub fn root(&self) -> Option<&Path> {
		self.root.as_deref()
	}

	pub(crate) fn handle(&self, name: &str) -> Result<Arc<IndexHandle>> {
		let indexes = self.indexes.read().map_err(|_| Error::Operation("index registry lock poisoned".into()))?;
		indexes
			.get(name)
			.cloned()
			.ok_or_else(|| Error::NotFound(format!("index '{}'", name)).into())
	}

	fn create_or_open(&self, name: &str, layout: &UnitSchema) -> Result<(Index, Provisioned)> {
		let schema = build_schema(layout);
		let Some(root) = &self.root else { return Ok((Index::create_in_ram(schema), Provisioned::Created)) };
		let dir = root.join(name);
		std::fs::create_dir_all(&dir)?;
		if Index::exists(&MmapDirectory::open(&dir)?)? {
			Ok((Index::open_in_dir(&dir)?, Provisioned::AlreadyPresent))
		} else {
			Ok((Index::create_in_dir(&dir, schema)?, Provisioned::Created))
		}
	}
}

fn write_all(writer: &mut IndexWriter, handle: &IndexHandle, units: &[(UnitId, UnitSource)]) -> tantivy::Result<()> {
	for (id, source) in units {
		writer.add_document(handle.to_document(id, source))?;
	}
	writer.commit()?;
	Ok(())
}

fn validate_index_name(name: &str) -> Result<()> {
	let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
	if valid { Ok(()) } else { Err(Error::Validation(format!("invalid index name '{}'", name)).into()) }
}

impl IndexHandle {
	fn contains_id(&self, id: &str) -> Result<bool> {
		let searcher = self.reader.searcher();
		let query = TermQuery::new(Term::from_field_text(self.fields.id, id), IndexRecordOption::Basic);
		Ok(searcher.search(&query, &Count)? > 0)
	}

	fn to_document(&self, id: &str, source: &UnitSource) -> TantivyDocument {
		let mut doc = TantivyDocument::default();
		doc.add_text(self.fields.id, id);
		doc.add_text(self.fields.text, &source.text);
		if let Some(sequence) = source.sequence {
			if let Some(line) = sequence.line_number { doc.add_u64(self.fields.line_number, line); }
			if let Some(paragraph) = sequence.paragraph_number { doc.add_u64(self.fields.paragraph_number, paragraph); }
		}
		doc
	}
}

impl UnitIndex for TantivyUnitIndex {
	fn ping(&self) -> bool {
		match &self.root {
			None => true,
			Some(root) => root.is_dir(),
		}
	}

	fn ensure_index(&self, name: &str, layout: &UnitSchema) -> Result<Provisioned> {
		validate_index_name(name)?;
		let mut indexes = self.indexes.write().map_err(|_| Error::Operation("index registry lock poisoned".into()))?;
		if indexes.contains_key(name) { return Ok(Provisioned::AlreadyPresent); }

		let (index, provisioned) = self.create_or_open(name, layout)?;
		register_tokenizer(&index);
		let fields = UnitFields::resolve(&index.schema(), layout)?;
		let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		let writer = index.writer::<TantivyDocument>(self.writer_memory_bytes)?;
		tracing::debug!(index = name, ?provisioned, "opened tantivy index");
		indexes.insert(name.to_string(), Arc::new(IndexHandle { index, reader, fields, writer: Mutex::new(writer) }));
		Ok(provisioned)
	}

	fn index(&self, name: &str, id: Option<&str>, source: &UnitSource) -> Result<IndexReceipt> {
		let id = match id {
			Some(id) => id.to_string(),
			None => Uuid::new_v4().to_string(),
		};
		self.index_batch(name, &[(id, source.clone())])?
			.pop()
			.ok_or_else(|| Error::Operation("write returned no receipt".into()).into())
	}

	/// One commit and one reader reload for the whole batch.
	fn index_batch(&self, name: &str, units: &[(UnitId, UnitSource)]) -> Result<Vec<IndexReceipt>> {
		let handle = self.handle(name)?;
		let mut batch_ids = HashSet::with_capacity(units.len());
		for (id, _) in units {
			if id.trim().is_empty() { return Err(Error::Validation("unit id must not be blank".into()).into()); }
			if !batch_ids.insert(id.as_str()) { return Err(Error::DuplicateId(id.clone()).into()); }
		}

		let mut writer = handle.writer.lock().map_err(|_| Error::Operation("index writer lock poisoned".into()))?;
		for (id, _) in units {
			if handle.contains_id(id)? { return Err(Error::DuplicateId(id.clone()).into()); }
		}
		if let Err(e) = write_all(&mut writer, &handle, units) {
			writer.rollback()?;
			return Err(e.into());
		}
		handle.reader.reload()?;
		Ok(units.iter().map(|(id, _)| IndexReceipt::created(id.clone())).collect())
	}

	fn match_query(&self, name: &str, field: &str, term: &str, limit: usize) -> Result<Vec<SearchHit>> {
		self.handle(name)?.match_term(field, term, limit)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use textmatch_core::types::Sequence;

	fn line(text: &str, n: u64) -> UnitSource {
		UnitSource { sequence: Some(Sequence::line(n)), text: text.to_string() }
	}

	#[test]
	fn ensure_index_is_idempotent_in_memory() {
		let backend = TantivyUnitIndex::in_memory();
		assert_eq!(backend.ensure_index("units", &UnitSchema::default()).expect("create"), Provisioned::Created);
		assert_eq!(backend.ensure_index("units", &UnitSchema::default()).expect("again"), Provisioned::AlreadyPresent);
		assert!(backend.ping());
	}

	#[test]
	fn unknown_index_is_not_found() {
		let backend = TantivyUnitIndex::in_memory();
		let err = backend.index("missing", None, &line("x", 1)).expect_err("no index");
		assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(_))));
	}

	#[test]
	fn path_like_names_are_rejected() {
		let backend = TantivyUnitIndex::in_memory();
		assert!(backend.ensure_index("../escape", &UnitSchema::default()).is_err());
		assert!(backend.ensure_index("", &UnitSchema::default()).is_err());
	}

	#[test]
	fn generated_ids_are_unique() {
		let backend = TantivyUnitIndex::in_memory();
		backend.ensure_index("units", &UnitSchema::default()).expect("create");
		let a = backend.index("units", None, &line("alpha", 1)).expect("a");
		let b = backend.index("units", None, &line("alpha", 2)).expect("b");
		assert_ne!(a.id, b.id);
		assert_eq!(a.result, "created");
	}

	#[test]
	fn duplicate_caller_id_is_rejected() {
		let backend = TantivyUnitIndex::in_memory();
		backend.ensure_index("units", &UnitSchema::default()).expect("create");
		backend.index("units", Some("1"), &line("alpha", 1)).expect("first");
		let err = backend.index("units", Some("1"), &line("beta", 1)).expect_err("duplicate");
		assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DuplicateId(id)) if id == "1"));
		assert_eq!(backend.match_query("units", "text", "beta", 10).expect("search").len(), 0);
	}

	#[test]
	fn batch_receipts_follow_input_order() {
		let backend = TantivyUnitIndex::in_memory();
		backend.ensure_index("units", &UnitSchema::default()).expect("create");
		let units = vec![("a:1".to_string(), line("alpha beta", 1)), ("a:2".to_string(), line("gamma alpha", 2))];
		let receipts = backend.index_batch("units", &units).expect("batch");
		let ids: Vec<&str> = receipts.iter().map(|r| r.id.as_str()).collect();
		assert_eq!(ids, vec!["a:1", "a:2"]);
		assert_eq!(backend.match_query("units", "text", "alpha", 10).expect("search").len(), 2);
	}

	#[test]
	fn batch_with_a_known_id_stores_nothing() {
		let backend = TantivyUnitIndex::in_memory();
		backend.ensure_index("units", &UnitSchema::default()).expect("create");
		backend.index("units", Some("b:2"), &line("old", 1)).expect("first");
		let units = vec![("b:1".to_string(), line("delta", 1)), ("b:2".to_string(), line("delta", 2))];
		let err = backend.index_batch("units", &units).expect_err("duplicate");
		assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DuplicateId(id)) if id == "b:2"));
		assert!(backend.match_query("units", "text", "delta", 10).expect("search").is_empty());

		let repeated = vec![("c".to_string(), line("x", 1)), ("c".to_string(), line("y", 2))];
		assert!(backend.index_batch("units", &repeated).is_err());
	}
}
