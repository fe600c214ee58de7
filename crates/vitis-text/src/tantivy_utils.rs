use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "vitis_text";

// Indonesian first, then English; the knowledge base mixes both.
const STOP_WORDS: &[&str] = &[
	"yang","dan","di","ke","dari","untuk","pada","dengan","ini","itu","atau","adalah","dalam","akan","tidak","juga","ada","oleh","karena","sebagai","bisa","dapat","saya","anda","apa","bagaimana","apakah","kami","kita","mereka","ia","nya","lebih","sudah","telah","agar","jika","maka","seperti","hal","tentang","tersebut",
	"a","an","and","are","as","at","be","by","for","from","has","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","there","then","than","so","if","when","where","how","what","which","who","can","could","should","would","do","does","did","have","had",
];

/// Handles to the fields of the chunk schema.
#[derive(Clone, Copy)]
pub struct ChunkFields {
	pub id: Field,
	pub text: Field,
	pub metadata: Field,
}

impl ChunkFields {
	pub fn from_schema(schema: &Schema) -> anyhow::Result<Self> {
		Ok(Self { id: schema.get_field("id")?, text: schema.get_field("text")?, metadata: schema.get_field("metadata")? })
	}
}

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("id", STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	schema_builder.add_text_field("text", text_options);
	// Flattened metadata as JSON text; stored only, never searched.
	schema_builder.add_text_field("metadata", STORED);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| (*s).to_string())))
		.build();
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
