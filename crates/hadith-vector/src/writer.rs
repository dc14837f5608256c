use anyhow::Result;
use arrow_array::{FixedSizeListArray, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use lancedb::Connection;
use std::sync::Arc;
use tracing::debug;

use hadith_core::types::PassageRecord;
use crate::schema::build_passage_schema;
use crate::table::table_exists;

/// Writes passages and their vectors into one collection table.
///
/// Rows are keyed by `hadith_id`: writing an id again replaces the old row.
pub struct CollectionWriter { conn: Connection, collection: String, dim: usize }

impl CollectionWriter {
	pub fn new(conn: Connection, collection: &str, dim: usize) -> Self {
		Self { conn, collection: collection.to_string(), dim }
	}

	pub async fn upsert(&self, passages: &[PassageRecord], vectors: &[Vec<f32>]) -> Result<usize> {
		if passages.is_empty() { return Ok(0); }
		anyhow::ensure!(passages.len() == vectors.len(), "passages and vectors length must match");
		if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
			anyhow::bail!("vector has {} dimensions, collection '{}' expects {}", bad.len(), self.collection, self.dim);
		}
		let batch = self.to_record_batch(passages, vectors)?;
		let schema = batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
		if table_exists(&self.conn, &self.collection).await? {
			let table = self.conn.open_table(&self.collection).execute().await?;
			let mut mi = table.merge_insert(&["hadith_id"]);
			mi.when_matched_update_all(None).when_not_matched_insert_all();
			let _ = mi.execute(reader).await?;
		} else {
			self.conn.create_table(&self.collection, reader).execute().await?;
		}
		debug!(collection = %self.collection, rows = passages.len(), "Upserted passages");
		Ok(passages.len())
	}

	fn to_record_batch(&self, passages: &[PassageRecord], vectors: &[Vec<f32>]) -> Result<RecordBatch> {
		let dim = i32::try_from(self.dim)?;
		let schema = build_passage_schema(dim);
		let col = |f: fn(&PassageRecord) -> &str| StringArray::from(passages.iter().map(f).collect::<Vec<_>>());
		let ids = Int64Array::from(passages.iter().map(|p| p.hadith_id).collect::<Vec<_>>());
		let arabic = StringArray::from(passages.iter().map(|p| p.arabic.as_deref()).collect::<Vec<_>>());
		let vectors = FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
			vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>())),
			dim,
		);
		let record_batch = RecordBatch::try_new(schema, vec![
			Arc::new(ids),
			Arc::new(col(|p| p.collection_reference.as_str())),
			Arc::new(col(|p| p.in_book_reference.as_str())),
			Arc::new(col(|p| p.web_reference.as_str())),
			Arc::new(col(|p| p.grading.as_str())),
			Arc::new(col(|p| p.narrator.as_str())),
			Arc::new(col(|p| p.text.as_str())),
			Arc::new(arabic),
			Arc::new(vectors),
		])?;
		Ok(record_batch)
	}
}
