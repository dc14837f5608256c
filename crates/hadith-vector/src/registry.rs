use async_trait::async_trait;
use lancedb::Connection;
use tracing::warn;

use hadith_core::error::{ExternalError, ExternalResult};
use hadith_core::traits::CollectionRegistry;
use hadith_core::types::CollectionInfo;

/// Every table in the database is a searchable collection.
#[derive(Clone)]
pub struct LanceRegistry { conn: Connection }

impl LanceRegistry {
	pub fn new(conn: Connection) -> Self { Self { conn } }
}

#[async_trait]
impl CollectionRegistry for LanceRegistry {
	async fn list_collections(&self) -> ExternalResult<Vec<CollectionInfo>> {
		let names = self.conn.table_names().execute().await
			.map_err(|e| ExternalError::Unavailable(format!("listing collections: {}", e)))?;
		let mut out = Vec::with_capacity(names.len());
		for name in names {
			// a table we cannot count is still listed, with no vectors
			let vector_count = match self.conn.open_table(&name).execute().await {
				Ok(t) => t.count_rows(None).await.unwrap_or_else(|e| { warn!(collection = %name, error = %e, "count_rows failed"); 0 }),
				Err(e) => { warn!(collection = %name, error = %e, "open_table failed"); 0 }
			};
			out.push(CollectionInfo { name, vector_count });
		}
		Ok(out)
	}
}
