use std::env;
use std::sync::Arc;

use anyhow::Context;
use hadith_core::config::{resolve_with_base, Config, Settings};
use hadith_core::data_processor::{collection_name_for_file, HadithLoader};
use hadith_core::traits::CollectionRegistry;
use hadith_core::types::{SearchRequest, SearchResponse};
use hadith_embed::get_default_embedder;
use hadith_pipeline::{Capabilities, Pipeline};
use hadith_reason::build_reasoners;
use hadith_vector::{ingest_collection, open_db, LanceIndex, LanceRegistry, DEFAULT_BATCH_SIZE};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "Usage: hadith <ingest|collections|query> [args...]
  hadith ingest [file.jsonl|dir]
  hadith collections
  hadith query \"<text>\" [--collections a,b] [--top-k N] [--json]";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{}", USAGE); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hadith=debug,lance=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => ingest(&settings, &args).await,
        "collections" => collections(&settings).await,
        "query" => query(&settings, &args).await,
        _ => { eprintln!("Unknown command: {}\n{}", cmd, USAGE); std::process::exit(1); }
    }
}

async fn ingest(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let source = match args.first() {
        Some(arg) => resolve_with_base(&env::current_dir()?, arg),
        None => settings.data.raw_path(),
    };
    let loader = HadithLoader::new();
    let collections = if source.is_file() {
        let name = collection_name_for_file(&source);
        let (docs, _) = loader.load_file(&source, &name)?;
        vec![(name, docs)]
    } else {
        loader.process_directory(&source)?
    };
    if collections.is_empty() { println!("No .jsonl files under {}", source.display()); return Ok(()); }

    let lancedb_path = settings.data.lancedb_path();
    std::fs::create_dir_all(&lancedb_path).with_context(|| format!("creating {}", lancedb_path.display()))?;
    let conn = open_db(&lancedb_path.to_string_lossy()).await?;
    let embedder = get_default_embedder(&settings.embedding)?;
    let retry = settings.retry.policy();
    let mut total = 0usize;
    for (name, docs) in &collections {
        let report = ingest_collection(&conn, name, docs, embedder.as_ref(), &retry, DEFAULT_BATCH_SIZE).await?;
        println!("✅ {}: {} hadiths in {} batches ({} ms)", report.collection, report.upserted, report.batches, report.elapsed_ms);
        total += report.upserted;
    }
    println!("📊 Ingested {} hadiths into {} collections at {}", total, collections.len(), lancedb_path.display());
    Ok(())
}

async fn collections(settings: &Settings) -> anyhow::Result<()> {
    let conn = open_db(&settings.data.lancedb_path().to_string_lossy()).await?;
    let mut listed = LanceRegistry::new(conn).list_collections().await?;
    listed.sort_by(|a, b| a.name.cmp(&b.name));
    if listed.is_empty() { println!("No collections. Run `hadith ingest` first."); }
    for c in &listed { println!("{:<32} {:>8} vectors", c.name, c.vector_count); }
    Ok(())
}

struct QueryArgs { text: String, collections: Option<Vec<String>>, top_k: Option<usize>, json: bool }

fn parse_query_args(args: &[String]) -> QueryArgs {
    let mut text = None; let mut collections = None; let mut top_k = None; let mut json = false;
    let mut i = 0; while i < args.len() { match args[i].as_str() {
        "--json" => json = true,
        "--collections" | "-c" => { if i + 1 < args.len() { collections = Some(args[i + 1].split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()); i += 1; } else { eprintln!("Error: --collections requires a comma-separated list"); std::process::exit(1); } }
        "--top-k" | "-k" => { if i + 1 < args.len() { if let Ok(k) = args[i + 1].parse::<usize>() { top_k = Some(k); i += 1; } else { eprintln!("Error: --top-k requires a number"); std::process::exit(1); } } else { eprintln!("Error: --top-k requires a number"); std::process::exit(1); } }
        _ if !args[i].starts_with('-') && text.is_none() => text = Some(args[i].clone()),
        other => { eprintln!("Unknown argument: {}", other); std::process::exit(1); } } i += 1; }
    let text = text.unwrap_or_else(|| { eprintln!("Usage: hadith query \"<text>\" [--collections a,b] [--top-k N] [--json]"); std::process::exit(1) });
    QueryArgs { text, collections, top_k, json }
}

async fn build_pipeline(settings: &Settings) -> anyhow::Result<Pipeline> {
    let conn = open_db(&settings.data.lancedb_path().to_string_lossy()).await?;
    let reasoners = build_reasoners(settings)?;
    let capabilities = Capabilities {
        classifier: reasoners.classifier,
        enhancer: reasoners.enhancer,
        clusterer: reasoners.clusterer,
        embedder: get_default_embedder(&settings.embedding)?,
        index: Arc::new(LanceIndex::new(conn.clone())),
        registry: Arc::new(LanceRegistry::new(conn)),
    };
    Ok(Pipeline::new(capabilities, settings))
}

async fn query(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let q = parse_query_args(args);
    let pipeline = build_pipeline(settings).await?;
    let mut request = SearchRequest::new(q.text);
    request.collections = q.collections;
    request.top_k = q.top_k;
    let response = match pipeline.handle_query(request).await {
        Ok(r) => r,
        Err(e) => {
            info!(class = ?e.class(), "Query failed");
            return Err(e.into());
        }
    };
    if q.json { println!("{}", serde_json::to_string_pretty(&response)?); } else { print_response(&response); }
    Ok(())
}

fn print_response(response: &SearchResponse) {
    if let Some(message) = &response.message { println!("{}", message); return; }
    println!("🔍 {} ({})", response.query, response.query_type);
    if response.enhanced_query != response.query { println!("   enhanced: {}", response.enhanced_query); }
    println!("   searched: {}", response.searched_collections.join(", "));
    for d in &response.degradations { println!("   ⚠️  {:?}", d); }
    for cluster in &response.clusters {
        println!("\n📚 {} ({} narrations)", cluster.event_title, cluster.hadith_indices.len());
        if let Some(primary) = response.results.get(cluster.primary_index) {
            println!("   primary: {} [{}]", primary.passage.collection_reference, primary.passage.collection);
        }
        for &i in cluster.hadith_indices.iter().filter(|&&i| i != cluster.primary_index) {
            if let Some(r) = response.results.get(i) { println!("   also:    {} [{}]", r.passage.collection_reference, r.passage.collection); }
        }
    }
    let standalone = response.standalone_indices();
    println!("\nFound {} results ({} standalone)", response.total_results, standalone.len());
    for (rank, r) in response.results.iter().enumerate() {
        let p = &r.passage;
        println!("\n  {}. score={:.4}  {}  {}  grading={}", rank + 1, r.score, p.collection, p.collection_reference, if p.grading.is_empty() { "-" } else { p.grading.as_str() });
        if !p.narrator.is_empty() { println!("     {}", p.narrator); }
        println!("     📝 {}", preview(&p.text, 300));
    }
}

fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max) { Some((idx, _)) => format!("{}...", &flat[..idx]), None => flat }
}
