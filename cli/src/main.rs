use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docsearch_core::{Category, DocumentId, SearchMode, SearchOptions, WeightBreakdown};
use docsearch_loader::{
    load_corpus, load_directory, load_jsonl, Corpus, HttpFetcher, DEFAULT_CONCURRENCY, DEFAULT_INDEX_URL,
    DEFAULT_REFERENCE_URLS,
};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "docsearch")]
#[command(about = "Search a markdown documentation corpus", long_about = None)]
struct Cli {
    /// Local directory of markdown files
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    /// JSONL file with one serialized document per line
    #[arg(long, global = true, conflicts_with = "dir")]
    jsonl: Option<PathBuf>,
    /// llms.txt index, used when neither --dir nor --jsonl is given
    #[arg(long, global = true, default_value = DEFAULT_INDEX_URL)]
    index_url: String,
    /// Concurrent document fetches for remote indexes
    #[arg(long, global = true, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank documents against a query
    Search {
        query: String,
        #[arg(long, default_value_t = SearchMode::Balanced)]
        mode: SearchMode,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        min_score: Option<f64>,
        /// Keep only documents containing one of these keywords (comma separated)
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,
        #[arg(long)]
        no_weights: bool,
        #[arg(long)]
        no_synonyms: bool,
        /// Drop results far below the top score for the chosen mode
        #[arg(long)]
        relative_cutoff: bool,
    },
    /// Documents with overlapping keywords
    Similar {
        id: DocumentId,
        #[arg(long, default_value_t = 3)]
        limit: usize,
    },
    /// Corpus, index and synonym table counts
    Stats,
    /// Write the loaded searchable documents as JSONL
    Export {
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct Hit {
    doc_id: DocumentId,
    title: String,
    url: String,
    category: Category,
    score: f64,
    bm25_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    breakdown: Option<WeightBreakdown>,
    sections: Vec<String>,
}

#[derive(Serialize)]
struct Similar {
    doc_id: DocumentId,
    title: String,
    similarity: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();
    let corpus = load(&cli).await?;

    match cli.command {
        Commands::Export { output } => export(&corpus, &output),
        Commands::Search { query, mode, limit, category, min_score, keywords, no_weights, no_synonyms, relative_cutoff } => {
            let mut options = SearchOptions::new()
                .mode(mode)
                .limit(limit)
                .keywords(keywords)
                .use_weights(!no_weights)
                .use_synonyms(!no_synonyms)
                .relative_cutoff(relative_cutoff);
            if let Some(category) = category {
                options = options.category(parse_category(&category)?);
            }
            if let Some(min_score) = min_score {
                options = options.min_score(min_score);
            }
            let repo = corpus.into_repository();
            let hits: Vec<Hit> = repo
                .search(&query, &options)
                .into_iter()
                .filter_map(|r| {
                    let doc = repo.get_document_by_id(r.document_id)?;
                    Some(Hit {
                        doc_id: r.document_id,
                        title: doc.title().to_string(),
                        url: doc.url().to_string(),
                        category: doc.category(),
                        score: r.score,
                        bm25_score: r.bm25_score,
                        breakdown: r.weight_breakdown,
                        sections: r.relevant_chunks.iter().map(|c| c.nearest_header().to_string()).collect(),
                    })
                })
                .collect();
            print_json(&hits)
        }
        Commands::Similar { id, limit } => {
            let repo = corpus.into_repository();
            if repo.get_document_by_id(id).is_none() {
                bail!("document {id} not found");
            }
            let similar: Vec<Similar> = repo
                .similar_documents_scored(id, limit)
                .into_iter()
                .map(|(doc, similarity)| Similar { doc_id: doc.id(), title: doc.title().to_string(), similarity })
                .collect();
            print_json(&similar)
        }
        Commands::Stats => {
            let loaded_at = corpus.loaded_at.clone();
            let repo = corpus.into_repository();
            print_json(&serde_json::json!({
                "loaded_at": loaded_at,
                "repository": repo.stats(),
                "synonyms": repo.synonyms().stats(),
            }))
        }
    }
}

async fn load(cli: &Cli) -> Result<Corpus> {
    if let Some(dir) = &cli.dir {
        return Ok(Corpus::new(load_directory(dir)?, Vec::new()));
    }
    if let Some(path) = &cli.jsonl {
        return Ok(Corpus::new(load_jsonl(path)?, Vec::new()));
    }
    let fetcher = Arc::new(HttpFetcher::with_defaults()?);
    load_corpus(fetcher, &cli.index_url, DEFAULT_REFERENCE_URLS, cli.concurrency).await
}

fn parse_category(raw: &str) -> Result<Category> {
    let category = Category::parse(raw);
    if category == Category::Unknown && !raw.trim().eq_ignore_ascii_case("unknown") {
        bail!("unknown category: {raw}");
    }
    Ok(category)
}

fn export(corpus: &Corpus, output: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(output).with_context(|| format!("creating {}", output.display()))?);
    for doc in &corpus.searchable {
        serde_json::to_writer(&mut out, doc)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    tracing::info!(output = %output.display(), documents = corpus.searchable.len(), "corpus exported");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

