use anyhow::Result;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::tokenizer::TokenStream;
use tantivy::{TantivyDocument, Term};

use textmatch_core::error::Error;
use textmatch_core::types::{SearchHit, Sequence, UnitSource};

use crate::index::IndexHandle;

impl IndexHandle {
	/// Match semantics follow a classic `match` query: the term goes through the
	/// field's analyzer and any resulting token may match.
	pub(crate) fn match_term(&self, field_name: &str, term: &str, limit: usize) -> Result<Vec<SearchHit>> {
		if limit == 0 { return Ok(Vec::new()); }
		let schema = self.index.schema();
		let field = schema.get_field(field_name)?;
		if !schema.get_field_entry(field).is_indexed() {
			return Err(Error::Backend(format!("field '{}' is not indexed", field_name)).into());
		}

		let mut analyzer = self.index.tokenizer_for_field(field)?;
		let mut stream = analyzer.token_stream(term);
		let mut terms: Vec<Term> = Vec::new();
		while stream.advance() {
			let t = Term::from_field_text(field, &stream.token().text);
			if !terms.contains(&t) { terms.push(t); }
		}
		let query: Box<dyn Query> = match terms.len() {
			0 => return Ok(Vec::new()),
			1 => Box::new(TermQuery::new(terms.remove(0), IndexRecordOption::WithFreqs)),
			_ => Box::new(BooleanQuery::new(
				terms.into_iter()
					.map(|t| (Occur::Should, Box::new(TermQuery::new(t, IndexRecordOption::WithFreqs)) as Box<dyn Query>))
					.collect(),
			)),
		};

		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&*query, &TopDocs::with_limit(limit))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			hits.push(self.decode(&doc, score)?);
		}
		Ok(hits)
	}

	fn decode(&self, doc: &TantivyDocument, score: f32) -> Result<SearchHit> {
		let id = doc
			.get_first(self.fields.id)
			.and_then(|v| v.as_str())
			.ok_or_else(|| Error::Backend("stored unit without id".into()))?
			.to_string();
		let text = doc.get_first(self.fields.text).and_then(|v| v.as_str()).unwrap_or("").to_string();
		let sequence = Sequence {
			line_number: doc.get_first(self.fields.line_number).and_then(|v| v.as_u64()),
			paragraph_number: doc.get_first(self.fields.paragraph_number).and_then(|v| v.as_u64()),
		};
		Ok(SearchHit { id, score, source: UnitSource { sequence: sequence.non_empty(), text } })
	}
}
