use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::category::Category;
use crate::chunker::{Chunk, Chunker};
use crate::tokenizer::TermMatcher;
use crate::DocumentId;

/// Domain vocabulary added to a document's keywords when it appears in the body.
pub const DOMAIN_TERMS: &[&str] = &[
    "authentication", "auth", "login", "signup", "register",
    "user", "token", "jwt", "cookie", "session",
    "api", "endpoint", "request", "response",
    "security", "validation", "error",
    "react", "vue", "nextjs", "javascript", "typescript",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub category: Category,
}

/// A document as handed over by a loader, before ids, keywords and chunks exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub url: String,
}

/// Indexed, immutable document.
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    category: Category,
    title: String,
    description: String,
    url: String,
    content: String,
    content_lower: String,
    content_length: usize,
    metadata_keywords: Vec<String>,
    keywords: BTreeSet<String>,
    chunks: Vec<Chunk>,
}

/// Compact view used in listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub title: String,
    pub description: String,
    pub url: String,
    pub category: Category,
    pub keywords: Vec<String>,
}

impl Document {
    pub fn new(id: DocumentId, source: SourceDocument) -> Self {
        Self::with_chunker(id, source, &Chunker::default())
    }

    pub fn with_chunker(id: DocumentId, source: SourceDocument, chunker: &Chunker) -> Self {
        let SourceDocument { content, metadata, url } = source;
        let content_lower = content.to_lowercase();
        let keywords = build_keywords(&metadata, &content_lower);
        let chunks = chunker.chunk(id, &metadata.title, &content, metadata.category);
        Self {
            id,
            category: metadata.category,
            title: metadata.title,
            description: metadata.description,
            url,
            content_length: content.chars().count(),
            content,
            content_lower,
            metadata_keywords: metadata.keywords,
            keywords,
            chunks,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Content length in characters.
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    pub fn keywords(&self) -> &BTreeSet<String> {
        &self.keywords
    }

    pub fn metadata_keywords(&self) -> &[String] {
        &self.metadata_keywords
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// True if `keyword` is one of the document's keywords or occurs anywhere
    /// in its content (substring, case-insensitive).
    pub fn has_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return false;
        }
        self.keywords.contains(&keyword) || self.content_lower.contains(&keyword)
    }

    /// Whole-word occurrences of the matcher's term in the content.
    pub fn term_frequency(&self, matcher: &TermMatcher) -> usize {
        matcher.count(&self.content_lower)
    }

    /// Up to `max` chunks ranked by how strongly they mention the query terms.
    /// Chunks with no mention are skipped; ties keep reading order.
    pub fn relevant_chunks(&self, matchers: &[TermMatcher], max: usize) -> Vec<&Chunk> {
        let mut scored: Vec<(&Chunk, f64)> = self
            .chunks
            .iter()
            .map(|c| (c, score_chunk(&c.text, matchers)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.into_iter().take(max).map(|(c, _)| c).collect()
    }

    /// Jaccard index of the two keyword sets.
    pub fn keyword_similarity(&self, other: &Document) -> f64 {
        let union = self.keywords.union(&other.keywords).count();
        if union == 0 {
            return 0.0;
        }
        let intersection = self.keywords.intersection(&other.keywords).count();
        intersection as f64 / union as f64
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            url: self.url.clone(),
            category: self.category,
            keywords: self.keywords.iter().cloned().collect(),
        }
    }
}

fn build_keywords(metadata: &DocumentMetadata, content_lower: &str) -> BTreeSet<String> {
    let mut keywords = BTreeSet::new();
    for keyword in &metadata.keywords {
        let k = keyword.trim().to_lowercase();
        if !k.is_empty() {
            keywords.insert(k);
        }
    }
    let title = metadata.title.to_lowercase();
    let description = metadata.description.to_lowercase();
    for word in title.split_whitespace().chain(description.split_whitespace()) {
        if word.chars().count() > 2 {
            keywords.insert(word.to_string());
        }
    }
    keywords.insert(metadata.category.as_str().to_string());
    for term in DOMAIN_TERMS {
        if content_lower.contains(term) {
            keywords.insert((*term).to_string());
        }
    }
    keywords
}

/// Heading passages count double, passages with a fenced code block count
/// one and a half times.
fn score_chunk(text: &str, matchers: &[TermMatcher]) -> f64 {
    let lower = text.to_lowercase();
    let mut factor = 1.0;
    if text.contains('#') {
        factor *= 2.0;
    }
    if text.contains("```") {
        factor *= 1.5;
    }
    matchers
        .iter()
        .map(|m| m.count(&lower) as f64 * factor)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(title: &str, description: &str, content: &str, category: Category) -> SourceDocument {
        SourceDocument {
            content: content.to_string(),
            metadata: DocumentMetadata {
                title: title.to_string(),
                description: description.to_string(),
                keywords: vec!["OAuth".to_string(), " Bearer ".to_string()],
                category,
            },
            url: "https://docs.example.com/api/login.md".to_string(),
        }
    }

    #[test]
    fn keywords_are_normalized_and_complete() {
        let doc = Document::new(0, source("Login API", "How to sign in", "Send a JWT with each request", Category::Api));
        let kw = doc.keywords();
        for expected in ["oauth", "bearer", "login", "api", "how", "sign", "jwt", "request"] {
            assert!(kw.contains(expected), "missing {expected}");
        }
        // title/description words of length <= 2 are skipped
        assert!(!kw.contains("to"));
        assert!(!kw.contains("in"));
        assert_eq!(doc.metadata_keywords(), &["OAuth".to_string(), " Bearer ".to_string()]);
    }

    #[test]
    fn has_keyword_checks_keywords_then_content() {
        let doc = Document::new(0, source("Login", "", "Cookies are set with withCredentials", Category::Unknown));
        assert!(doc.has_keyword("LOGIN"));
        assert!(doc.has_keyword("withcredentials"));
        assert!(!doc.has_keyword("graphql"));
        assert!(!doc.has_keyword("   "));
    }

    #[test]
    fn term_frequency_is_whole_word() {
        let doc = Document::new(0, source("T", "", "login Login relogin login_id", Category::Api));
        assert_eq!(doc.term_frequency(&TermMatcher::new("login")), 2);
        assert_eq!(doc.content_length(), 28);
    }

    #[test]
    fn relevant_chunks_prefer_code_and_skip_misses() {
        let code = format!("# Code\n```js\nlogin()\n```\n{}", "pad ".repeat(40));
        let plain = format!("# Plain\nlogin here\n{}", "pad ".repeat(40));
        let none = format!("# None\n{}", "pad ".repeat(40));
        let content = format!("{plain}\n{none}\n{code}");
        let src = source("Doc", "", &content, Category::Api);
        let doc = Document::with_chunker(1, src, &Chunker::new(30));
        assert_eq!(doc.chunks().len(), 3);

        let chunks = doc.relevant_chunks(&[TermMatcher::new("login")], 3);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].nearest_header(), "Code");
        assert_eq!(chunks[1].nearest_header(), "Plain");
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = Document::new(0, source("Login API", "", "token", Category::Api));
        let b = Document::new(1, source("Signup API", "", "token", Category::Api));
        let s = a.keyword_similarity(&b);
        assert!(s > 0.0 && s < 1.0);
        assert_eq!(s, b.keyword_similarity(&a));
        assert_eq!(a.keyword_similarity(&a), 1.0);
    }
}
