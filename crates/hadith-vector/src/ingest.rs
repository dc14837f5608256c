//! Embed loaded hadith documents and upsert them into their collection table.
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::time::Instant;
use tracing::info;

use hadith_core::data_processor::HadithDocument;
use hadith_core::retry::{with_retry, RetryPolicy};
use hadith_core::traits::Embedder;
use crate::writer::CollectionWriter;

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
	pub collection: String,
	pub upserted: usize,
	pub batches: usize,
	pub elapsed_ms: u128,
}

pub async fn ingest_collection(
	conn: &Connection,
	collection: &str,
	docs: &[HadithDocument],
	embedder: &dyn Embedder,
	retry: &RetryPolicy,
	batch_size: usize,
) -> Result<IngestReport> {
	let started = Instant::now();
	let writer = CollectionWriter::new(conn.clone(), collection, embedder.dim());
	let batch_size = batch_size.max(1);
	let pb = ProgressBar::new(docs.len() as u64);
	if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} hadiths ({percent}%) {msg}") {
		pb.set_style(style.progress_chars("#>-"));
	}
	pb.set_message(collection.to_string());
	let mut upserted = 0usize; let mut batches = 0usize;
	for chunk in docs.chunks(batch_size) {
		let texts: Vec<String> = chunk.iter().map(|d| d.embed_text.clone()).collect();
		let vectors = with_retry(retry, "embed_batch", || embedder.embed_batch(&texts)).await?;
		let passages: Vec<_> = chunk.iter().map(|d| d.passage.clone()).collect();
		upserted += writer.upsert(&passages, &vectors).await?;
		batches += 1;
		pb.inc(chunk.len() as u64);
	}
	pb.finish_and_clear();
	let report = IngestReport { collection: collection.to_string(), upserted, batches, elapsed_ms: started.elapsed().as_millis() };
	info!(collection, upserted, batches, elapsed_ms = report.elapsed_ms as u64, "Ingested collection");
	Ok(report)
}
