use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// One table per collection; the table name is the collection name.
pub fn build_passage_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("hadith_id", DataType::Int64, false),
		Field::new("collection_reference", DataType::Utf8, false),
		Field::new("in_book_reference", DataType::Utf8, false),
		Field::new("web_reference", DataType::Utf8, false),
		Field::new("grading", DataType::Utf8, false),
		Field::new("narrator", DataType::Utf8, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("arabic", DataType::Utf8, true),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
