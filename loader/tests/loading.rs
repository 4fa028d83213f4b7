use anyhow::{anyhow, Result};
use async_trait::async_trait;
use docsearch_core::{Category, SearchOptions};
use docsearch_loader::{load_corpus, load_directory, load_jsonl, DocumentLoader, Fetch, RawDoc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

#[derive(Default)]
struct FakeFetcher {
    pages: HashMap<String, (String, u64)>,
    requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn page(mut self, url: &str, body: &str, delay_ms: u64) -> Self {
        self.pages.insert(url.to_string(), (body.to_string(), delay_ms));
        self
    }
}

#[async_trait]
impl Fetch for FakeFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.requested.lock().push(url.to_string());
        let key = url.split('?').next().unwrap_or(url);
        let (body, delay) = self.pages.get(key).cloned().ok_or_else(|| anyhow!("404 {url}"))?;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(body)
    }
}

fn raw(link: &str) -> RawDoc {
    RawDoc { title: String::new(), link: link.to_string(), description: String::new() }
}

#[tokio::test]
async fn load_keeps_order_drops_failures_and_duplicates() {
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("https://d.dev/api/a.md", "# A\n\nfirst page body text", 40)
            .page("https://d.dev/api/b.md", "# B\n\nsecond page body text", 0)
            .page("https://d.dev/dev/c.md", "# C\n\nthird page body text", 20),
    );
    let loader = DocumentLoader::new(fetcher.clone(), 4);
    let docs = loader
        .load(&[
            raw("https://d.dev/api/a.md"),
            raw("https://d.dev/missing.md"),
            raw("https://d.dev/api/b.md"),
            raw("https://d.dev/api/a.md"),
            raw("https://d.dev/dev/c.md"),
        ])
        .await;

    let titles: Vec<&str> = docs.iter().map(|d| d.metadata.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B", "C"]);
    assert_eq!(docs[2].metadata.category, Category::Dev);
    assert_eq!(fetcher.requested.lock().len(), 4);
}

#[tokio::test]
async fn index_title_and_description_fill_gaps() {
    let fetcher = Arc::new(FakeFetcher::default().page("https://d.dev/api/x.md", "no heading here", 0));
    let docs = DocumentLoader::new(fetcher, 1)
        .load(&[RawDoc {
            title: "Listed Title".into(),
            link: "https://d.dev/api/x.md".into(),
            description: "from the index".into(),
        }])
        .await;
    assert_eq!(docs[0].metadata.title, "Listed Title");
    assert_eq!(docs[0].metadata.description, "from the index");
}

#[tokio::test]
async fn corpus_from_index_is_searchable() {
    let index = "\
# Docs
- [Login](https://docs.example.com/api/login.md): Sign a user in
- [Signup](https://docs.example.com/templates/signup.md): Signup form
- [Other site](https://other.example.com/x.md): ignored
";
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("https://docs.example.com/llms.txt", index, 0)
            .page(
                "https://docs.example.com/api/login.md",
                "# Login API\n\nCall the login endpoint to create a session cookie for the user.",
                5,
            )
            .page(
                "https://docs.example.com/templates/signup.md",
                "# Signup Template\n\nA ready made signup form that calls the signup endpoint.",
                0,
            )
            .page("https://docs.example.com/common/errors.md", "# Errors\n\nError codes returned by every login call.", 0),
    );

    let corpus = load_corpus(fetcher.clone(), "https://docs.example.com/llms.txt", &["https://docs.example.com/common/errors.md"], 2)
        .await
        .unwrap();
    assert_eq!(corpus.searchable.len(), 2);
    assert_eq!(corpus.reference.len(), 1);
    assert!(!corpus.loaded_at.is_empty());

    let requested = fetcher.requested.lock().clone();
    assert!(requested[0].starts_with("https://docs.example.com/llms.txt?t="));
    assert!(!requested.iter().any(|u| u.contains("other.example.com")));

    let repo = corpus.into_repository();
    let hits = repo.search("login", &SearchOptions::default());
    assert_eq!(hits.first().map(|h| h.document_id), Some(0));
    // the reference document mentions login but is not ranked
    assert!(hits.iter().all(|h| h.document_id != 2));
    assert_eq!(repo.get_document_by_id(2).map(|d| d.title()), Some("Errors"));
}

#[tokio::test]
async fn index_fetch_failure_is_an_error() {
    let fetcher = Arc::new(FakeFetcher::default());
    let none: [&str; 0] = [];
    assert!(load_corpus(fetcher, "https://docs.example.com/llms.txt", &none, 2).await.is_err());
}

#[test]
fn directory_loading_is_sorted_and_categorized() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("api")).unwrap();
    fs::create_dir_all(dir.path().join("templates")).unwrap();
    fs::write(dir.path().join("templates/signup.md"), "# Signup\n\nSignup form template for new users.").unwrap();
    fs::write(dir.path().join("api/login.md"), "# Login\n\nLogin endpoint reference for the auth API.").unwrap();
    fs::write(dir.path().join("notes.txt"), "not markdown").unwrap();

    let docs = load_directory(dir.path()).unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].url, "api/login.md");
    assert_eq!(docs[0].metadata.category, Category::Api);
    assert_eq!(docs[1].metadata.category, Category::Templates);
    assert_eq!(docs[1].metadata.title, "Signup");
}

#[test]
fn jsonl_round_trip_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corpus.jsonl");
    fs::write(
        &path,
        r#"{"content":"login body","metadata":{"title":"Login","category":"api"},"url":"u1"}

{"content":"other body","metadata":{"title":"Other","category":"nonsense"}}
"#,
    )
    .unwrap();
    let docs = load_jsonl(&path).unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].metadata.category, Category::Api);
    assert_eq!(docs[1].metadata.category, Category::Unknown);
    assert_eq!(docs[1].url, "");

    fs::write(&path, "{not json}\n").unwrap();
    assert!(load_jsonl(&path).is_err());
}
