use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, INDEXED, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer};
use tantivy::Index;

use textmatch_core::types::UnitSchema;

pub const UNIT_TOKENIZER: &str = "unit_text";

pub fn build_schema(layout: &UnitSchema) -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field(&layout.id_field, STRING | STORED);
	schema_builder.add_u64_field(&layout.line_number_field, INDEXED | STORED);
	schema_builder.add_u64_field(&layout.paragraph_number_field, INDEXED | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(UNIT_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	schema_builder.add_text_field(&layout.text_field, text_options);
	schema_builder.build()
}

/// Lower-cased word tokens, no stop words, so any word of a stored line can find it.
pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(64))
		.filter(LowerCaser)
		.build();
	index.tokenizers().register(UNIT_TOKENIZER, tokenizer);
}

/// Resolved field handles for one index.
#[derive(Debug, Clone, Copy)]
pub struct UnitFields {
	pub id: Field,
	pub text: Field,
	pub line_number: Field,
	pub paragraph_number: Field,
}

impl UnitFields {
	pub fn resolve(schema: &Schema, layout: &UnitSchema) -> tantivy::Result<Self> {
		Ok(Self {
			id: schema.get_field(&layout.id_field)?,
			text: schema.get_field(&layout.text_field)?,
			line_number: schema.get_field(&layout.line_number_field)?,
			paragraph_number: schema.get_field(&layout.paragraph_number_field)?,
		})
	}
}
