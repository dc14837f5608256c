use arrow_array::{Array, Float32Array, Int64Array, RecordBatch, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use tracing::debug;

use hadith_core::error::{ExternalError, ExternalResult};
use hadith_core::traits::VectorIndex;
use hadith_core::types::{PassageRecord, ScoredResult};
use crate::table::to_external;

/// Per-collection nearest-neighbour search over LanceDB tables.
#[derive(Clone)]
pub struct LanceIndex { conn: Connection }

impl LanceIndex {
	pub fn new(conn: Connection) -> Self { Self { conn } }
}

#[async_trait]
impl VectorIndex for LanceIndex {
	async fn query(&self, collection: &str, vector: &[f32], k: usize) -> ExternalResult<Vec<ScoredResult>> {
		if k == 0 { return Ok(Vec::new()); }
		let table = self.conn.open_table(collection).execute().await.map_err(|e| to_external(collection, e))?;
		let mut stream = table
			.vector_search(vector.to_vec()).map_err(|e| to_external(collection, e))?
			.distance_type(DistanceType::Cosine)
			.limit(k)
			.execute().await.map_err(|e| to_external(collection, e))?;
		let mut out = Vec::new();
		while let Some(batch) = TryStreamExt::try_next(&mut stream).await.map_err(|e| to_external(collection, e))? {
			read_batch(collection, &batch, &mut out)?;
		}
		out.sort_by(|a, b| b.score.total_cmp(&a.score));
		out.truncate(k);
		debug!(collection, hits = out.len(), "Vector query");
		Ok(out)
	}
}

fn read_batch(collection: &str, batch: &RecordBatch, out: &mut Vec<ScoredResult>) -> ExternalResult<()> {
	let ids = column::<Int64Array>(batch, "hadith_id")?;
	let collection_ref = column::<StringArray>(batch, "collection_reference")?;
	let in_book = column::<StringArray>(batch, "in_book_reference")?;
	let web = column::<StringArray>(batch, "web_reference")?;
	let grading = column::<StringArray>(batch, "grading")?;
	let narrator = column::<StringArray>(batch, "narrator")?;
	let text = column::<StringArray>(batch, "text")?;
	let arabic = column::<StringArray>(batch, "arabic")?;
	let distance = column::<Float32Array>(batch, "_distance")?;
	for i in 0..batch.num_rows() {
		let passage = PassageRecord {
			collection: collection.to_string(),
			hadith_id: ids.value(i),
			collection_reference: collection_ref.value(i).to_string(),
			in_book_reference: in_book.value(i).to_string(),
			web_reference: web.value(i).to_string(),
			grading: grading.value(i).to_string(),
			narrator: narrator.value(i).to_string(),
			text: text.value(i).to_string(),
			arabic: if arabic.is_null(i) { None } else { Some(arabic.value(i).to_string()) },
		};
		out.push(ScoredResult::new(passage, 1.0 - distance.value(i)));
	}
	Ok(())
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> ExternalResult<&'a T> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| ExternalError::MalformedOutput(format!("missing or mistyped column '{}'", name)))
}
