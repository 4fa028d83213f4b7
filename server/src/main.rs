use anyhow::Result;
use axum::Router;
use clap::Parser;
use docsearch_core::DocsRepository;
use docsearch_loader::{load_corpus, load_directory, Corpus, HttpFetcher, DEFAULT_CONCURRENCY, DEFAULT_INDEX_URL, DEFAULT_REFERENCE_URLS};
use docsearch_server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "docsearch-server")]
#[command(about = "Serve ranked search over a markdown documentation corpus")]
struct Args {
    /// llms.txt index listing the searchable documents
    #[arg(long, default_value = DEFAULT_INDEX_URL)]
    index_url: String,
    /// Reference document url (repeatable); defaults to the built-in set
    #[arg(long = "reference-url")]
    reference_urls: Vec<String>,
    /// Serve a local directory of markdown files instead of a remote index
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Replaces `[PROJECT_ID]` in served documents
    #[arg(long, env = "BAAS_PROJECT_ID")]
    project_id: Option<String>,
    /// Concurrent document fetches
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
}

async fn load_repository(args: &Args) -> DocsRepository {
    let corpus = match &args.dir {
        Some(dir) => load_directory(dir).map(|docs| Corpus::new(docs, Vec::new())),
        None => {
            let reference: Vec<String> = if args.reference_urls.is_empty() {
                DEFAULT_REFERENCE_URLS.iter().map(|u| u.to_string()).collect()
            } else {
                args.reference_urls.clone()
            };
            match HttpFetcher::new(docsearch_loader::fetch::DEFAULT_USER_AGENT, Duration::from_secs(args.timeout_secs)) {
                Ok(fetcher) => load_corpus(Arc::new(fetcher), &args.index_url, &reference, args.concurrency).await,
                Err(e) => Err(e),
            }
        }
    };
    match corpus {
        Ok(corpus) => corpus.into_repository(),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "failed to load corpus, serving an empty repository");
            DocsRepository::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let repo = Arc::new(load_repository(&args).await);
    let app: Router = build_app(repo, args.project_id.clone());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
