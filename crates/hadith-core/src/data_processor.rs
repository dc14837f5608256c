//! JSONL hadith source loading for ingestion.
//!
//! Each line of a collection file is one JSON object with the fields
//! `English`, `Arabic`, `Collection Reference`, `In-Book Reference`,
//! `Web Reference` and `Grading`. The 1-based line number becomes the
//! within-collection `hadith_id`.
use anyhow::Result;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::Error;
use crate::types::{CollectionName, PassageRecord};

/// Embedding input is cut to this many characters.
pub const MAX_EMBED_CHARS: usize = 32_000;

const COLLECTION_ALIASES: &[(&str, &str)] = &[
    ("sahih-bukhari", "hadith-bukhari"),
    ("bukhari", "hadith-bukhari"),
    ("sahih-muslim", "hadith-muslim"),
    ("muslim", "hadith-muslim"),
    ("sunan-abudawud", "hadith-abudawud"),
    ("abudawud", "hadith-abudawud"),
    ("abu-dawood", "hadith-abudawud"),
    ("sunan-tirmidhi", "hadith-tirmidhi"),
    ("tirmidhi", "hadith-tirmidhi"),
    ("sunan-an-nasai", "hadith-nasai"),
    ("sunan-nasai", "hadith-nasai"),
    ("nasai", "hadith-nasai"),
    ("sunan-ibn-majah", "hadith-ibn-majah"),
    ("ibn-majah", "hadith-ibn-majah"),
];

/// A passage ready to be embedded and written to its collection.
#[derive(Debug, Clone)]
pub struct HadithDocument {
    pub passage: PassageRecord,
    pub embed_text: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub loaded: usize,
    pub invalid_lines: usize,
    pub empty_texts: usize,
}

#[derive(Default)]
pub struct HadithLoader;

impl HadithLoader {
    pub fn new() -> Self { Self }

    /// Load every `*.jsonl` file under `data_dir`, one collection per file.
    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<(CollectionName, Vec<HadithDocument>)>> {
        let files = list_collection_files(data_dir);
        if files.is_empty() {
            warn!(dir = %data_dir.display(), "No .jsonl files found");
            return Ok(vec![]);
        }
        let mut out = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.iter().enumerate() {
            let collection = collection_name_for_file(file_path);
            info!(file = %file_path.display(), %collection, "Processing file {}/{}", file_index + 1, files.len());
            let (docs, _) = self.load_file(file_path, &collection)?;
            out.push((collection, docs));
        }
        Ok(out)
    }

    pub fn load_file(&self, path: &Path, collection: &str) -> Result<(Vec<HadithDocument>, LoadStats)> {
        if !path.is_file() {
            return Err(Error::NotFound(path.display().to_string()).into());
        }
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => String::from_utf8_lossy(&fs::read(path)?).to_string(),
        };
        let (docs, stats) = self.parse_lines(&content, collection);
        info!(
            collection,
            loaded = stats.loaded,
            invalid_lines = stats.invalid_lines,
            empty_texts = stats.empty_texts,
            "Loaded hadiths"
        );
        Ok((docs, stats))
    }

    pub fn parse_lines(&self, content: &str, collection: &str) -> (Vec<HadithDocument>, LoadStats) {
        let mut stats = LoadStats::default();
        let mut docs = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line_num = idx + 1;
            let line = line.trim();
            if line.is_empty() { continue; }
            let obj: Map<String, Value> = match serde_json::from_str(line) {
                Ok(Value::Object(obj)) => obj,
                Ok(_) | Err(_) => {
                    warn!(collection, line = line_num, "Skipping invalid JSON line");
                    stats.invalid_lines += 1;
                    continue;
                }
            };
            match to_document(&obj, collection, line_num as i64) {
                Some(doc) => { docs.push(doc); stats.loaded += 1; }
                None => stats.empty_texts += 1,
            }
        }
        (docs, stats)
    }
}

fn field(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn to_document(obj: &Map<String, Value>, collection: &str, hadith_id: i64) -> Option<HadithDocument> {
    let english = field(obj, "English");
    let collection_reference = field(obj, "Collection Reference");
    let embed_text: String = format!("{} {}", english, collection_reference).trim().chars().take(MAX_EMBED_CHARS).collect();
    if english.trim().is_empty() || embed_text.is_empty() { return None; }
    // The first line of the English text is the narrator chain when the text spans lines.
    let narrator = english.split_once('\n').map(|(first, _)| first.trim().to_string()).unwrap_or_default();
    let arabic = field(obj, "Arabic");
    Some(HadithDocument {
        passage: PassageRecord {
            collection: collection.to_string(),
            hadith_id,
            collection_reference,
            in_book_reference: field(obj, "In-Book Reference"),
            web_reference: field(obj, "Web Reference"),
            grading: field(obj, "Grading"),
            narrator,
            text: english,
            arabic: if arabic.trim().is_empty() { None } else { Some(arabic) },
        },
        embed_text,
    })
}

/// Map a source file name to its collection (index) name.
///
/// Known aliases win (`sahih-bukhari.jsonl` -> `hadith-bukhari`); anything
/// else becomes `hadith-<stem>` with non-alphanumerics removed.
pub fn collection_name_for_file(path: &Path) -> CollectionName {
    let stem = path
        .file_name()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let stem = stem.trim_end_matches(".jsonl").trim_end_matches(".json");
    let stem = stem.replace("_cleaned", "").trim().replace(' ', "-");
    for (alias, name) in COLLECTION_ALIASES {
        if stem.contains(alias) { return (*name).to_string(); }
    }
    let clean: String = stem.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-').collect();
    format!("hadith-{}", clean)
}

/// Sorted `*.jsonl` files under `root`.
pub fn list_collection_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("jsonl") { files.push(path.to_path_buf()); }
    }
    files.sort();
    files
}
