//! Corpus loading: remote `llms.txt` indexes, local markdown trees and JSONL dumps.

pub mod fetch;
pub mod llms;
pub mod metadata;

use anyhow::{Context, Result};
use docsearch_core::{DocsRepository, SourceDocument};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Semaphore;
use url::Url;
use walkdir::WalkDir;

pub use fetch::{Fetch, HttpFetcher};
pub use llms::{parse_llms_txt, reference_raw_docs, RawDoc};
pub use metadata::extract_metadata;

pub const DEFAULT_INDEX_URL: &str = "https://docs.aiapp.link/llms.txt";

/// Documents kept out of the index but always reachable by id.
pub const DEFAULT_REFERENCE_URLS: &[&str] = &[
    "https://docs.aiapp.link/common/security.md",
    "https://docs.aiapp.link/common/errors.md",
    "https://docs.aiapp.link/common/state-management.md",
];

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Everything a repository is built from.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Corpus {
    pub searchable: Vec<SourceDocument>,
    pub reference: Vec<SourceDocument>,
    /// RFC 3339 timestamp of when loading finished.
    pub loaded_at: String,
}

impl Corpus {
    pub fn new(searchable: Vec<SourceDocument>, reference: Vec<SourceDocument>) -> Self {
        let loaded_at = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        Self { searchable, reference, loaded_at }
    }

    pub fn into_repository(self) -> DocsRepository {
        DocsRepository::from_sources(self.searchable, self.reference)
    }
}

/// Fetches the documents listed in an index.
pub struct DocumentLoader<F> {
    fetcher: Arc<F>,
    concurrency: usize,
}

impl<F: Fetch> DocumentLoader<F> {
    pub fn new(fetcher: Arc<F>, concurrency: usize) -> Self {
        Self { fetcher, concurrency: concurrency.max(1) }
    }

    /// Fetch every distinct link concurrently. Failed documents are logged and
    /// left out; the rest keep the order of `raw_docs`.
    pub async fn load(&self, raw_docs: &[RawDoc]) -> Vec<SourceDocument> {
        let mut seen = HashSet::new();
        let unique: Vec<&RawDoc> = raw_docs.iter().filter(|d| seen.insert(d.link.as_str())).collect();
        let permits = Arc::new(Semaphore::new(self.concurrency));

        let tasks = unique.iter().map(|raw| {
            let permits = permits.clone();
            async move {
                let _permit = permits.acquire().await.ok()?;
                match self.fetcher.fetch_text(&raw.link).await {
                    Ok(content) => Some(to_source(raw, content)),
                    Err(e) => {
                        tracing::warn!(link = %raw.link, error = %e, "failed to fetch document");
                        None
                    }
                }
            }
        });
        let docs: Vec<SourceDocument> = join_all(tasks).await.into_iter().flatten().collect();
        tracing::info!(requested = unique.len(), loaded = docs.len(), "documents loaded");
        docs
    }
}

fn to_source(raw: &RawDoc, content: String) -> SourceDocument {
    let mut metadata = extract_metadata(&content, &raw.link);
    if metadata.title == "Untitled" && !raw.title.is_empty() {
        metadata.title = raw.title.clone();
    }
    if metadata.description.is_empty() {
        metadata.description = raw.description.clone();
    }
    SourceDocument { content, metadata, url: raw.link.clone() }
}

/// Load the documents listed by `index_url` plus the given reference documents.
///
/// The index request carries a `t=<millis>` parameter so caches in front of
/// the docs host never serve a stale listing. Only links on the index's own
/// origin are followed.
pub async fn load_corpus<F, S>(fetcher: Arc<F>, index_url: &str, reference_urls: &[S], concurrency: usize) -> Result<Corpus>
where
    F: Fetch,
    S: AsRef<str>,
{
    let mut url = Url::parse(index_url).with_context(|| format!("invalid index url {index_url}"))?;
    let millis = time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    url.query_pairs_mut().append_pair("t", &millis.to_string());

    let index = fetcher.fetch_text(url.as_str()).await.context("fetching document index")?;
    let origin = url.origin().ascii_serialization();
    let raw_docs = parse_llms_txt(&index, Some(&origin));
    tracing::info!(index_url, entries = raw_docs.len(), "parsed document index");

    let loader = DocumentLoader::new(fetcher, concurrency);
    let searchable = loader.load(&raw_docs).await;
    let reference = loader.load(&reference_raw_docs(reference_urls)).await;
    Ok(Corpus::new(searchable, reference))
}

/// Every `*.md` file under `root`, sorted by path. Each document's url is its
/// path relative to `root`, so directory names act as categories.
pub fn load_directory(root: impl AsRef<Path>) -> Result<Vec<SourceDocument>> {
    let root = root.as_ref();
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("md"))
        .collect();
    files.sort();

    let mut docs = Vec::with_capacity(files.len());
    for file in files {
        let content = fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
        let rel = file.strip_prefix(root).unwrap_or(&file).to_string_lossy().replace('\\', "/");
        let metadata = extract_metadata(&content, &rel);
        docs.push(SourceDocument { content, metadata, url: rel });
    }
    tracing::info!(root = %root.display(), documents = docs.len(), "loaded markdown directory");
    Ok(docs)
}

/// One serialized `SourceDocument` per line; blank lines are skipped.
pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Vec<SourceDocument>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    let mut docs = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: SourceDocument =
            serde_json::from_str(&line).with_context(|| format!("{}:{}: invalid document", path.display(), n + 1))?;
        docs.push(doc);
    }
    Ok(docs)
}
