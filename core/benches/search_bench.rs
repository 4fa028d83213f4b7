use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use docsearch_core::{Category, DocsRepository, DocumentMetadata, SearchMode, SearchOptions, SourceDocument};

const WORDS: &[&str] = &[
    "login", "signup", "token", "cookie", "session", "user", "profile", "request", "response",
    "endpoint", "react", "template", "config", "error", "retry", "header", "project", "database",
];

fn synthetic_corpus(docs: usize, words_per_doc: usize) -> Vec<SourceDocument> {
    (0..docs)
        .map(|i| {
            let mut content = format!("# Page {i}\n\n");
            for w in 0..words_per_doc {
                content.push_str(WORDS[(i * 7 + w * 13) % WORDS.len()]);
                content.push(if w % 40 == 39 { '\n' } else { ' ' });
            }
            SourceDocument {
                content,
                metadata: DocumentMetadata {
                    title: format!("Page {i}"),
                    category: Category::KNOWN[i % Category::KNOWN.len()],
                    ..Default::default()
                },
                url: format!("https://docs.example.com/page-{i}.md"),
            }
        })
        .collect()
}

fn bench_search(c: &mut Criterion) {
    let repo = DocsRepository::from_sources(synthetic_corpus(200, 400), Vec::new());
    let mut group = c.benchmark_group("search");
    for mode in SearchMode::ALL {
        let opts = SearchOptions::new().mode(mode);
        group.bench_with_input(BenchmarkId::new("login_token", mode), &opts, |b, opts| {
            b.iter(|| repo.search(black_box("login token"), opts))
        });
    }
    group.bench_function("korean_expanded", |b| b.iter(|| repo.search(black_box("로그인 토큰"), &SearchOptions::default())));
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let sources = synthetic_corpus(100, 400);
    c.bench_function("build_repository_100", |b| {
        b.iter(|| DocsRepository::from_sources(black_box(sources.clone()), Vec::new()))
    });
}

criterion_group!(benches, bench_search, bench_build);
criterion_main!(benches);
