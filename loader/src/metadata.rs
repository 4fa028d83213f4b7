//! Metadata extraction from a fetched markdown document.

use docsearch_core::{Category, DocumentMetadata};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

lazy_static! {
    static ref FENCE_LINE: Regex = Regex::new(r"(?m)^[ \t]*```.*$").expect("valid regex");
    static ref CODE_BLOCK: Regex = Regex::new(r"(?s)```.*?```").expect("valid regex");
    static ref INLINE_CODE: Regex = Regex::new(r"`([^`]+)`").expect("valid regex");
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s\p{Hangul}]").expect("valid regex");
    static ref HEADING_LINE: Regex = Regex::new(r"^#{1,6}\s").expect("valid regex");
}

/// Technical vocabulary added to keywords whenever it appears in a source text.
const TECHNICAL_TERMS: &[&str] = &[
    "api", "jwt", "token", "cookie", "auth", "login", "signup",
    "react", "vue", "nextjs", "javascript", "typescript", "cors",
    "http", "https", "json", "fetch", "axios", "express",
    "security", "encryption", "validation", "error", "response",
];

const TITLE_SCAN_LINES: usize = 20;
const DESCRIPTION_SCAN_LINES: usize = 30;
const MIN_DESCRIPTION_CHARS: usize = 20;
const UNTITLED: &str = "Untitled";

/// Derive title, description, keywords and category for a document.
///
/// `url` may be a full URL or a plain relative path (as produced for local
/// files); either way its path decides the category and adds keywords.
pub fn extract_metadata(content: &str, url: &str) -> DocumentMetadata {
    let lines: Vec<&str> = content.lines().collect();

    let title = lines
        .iter()
        .take(TITLE_SCAN_LINES)
        .find_map(|line| line.strip_prefix("# "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED)
        .to_string();

    let description = lines
        .iter()
        .take(DESCRIPTION_SCAN_LINES)
        .find(|line| {
            !line.trim().is_empty()
                && !line.starts_with('#')
                && !line.starts_with("```")
                && line.chars().count() > MIN_DESCRIPTION_CHARS
        })
        .map(|line| line.trim().to_string())
        .unwrap_or_default();

    let path = url_path(url);
    let code = code_blocks(content);
    let heads = headings(content);
    let mut keywords = Vec::new();
    for source in [title.as_str(), description.as_str(), code.as_str(), heads.as_str()] {
        if !source.is_empty() {
            keywords.extend(keywords_from_text(source));
        }
    }
    keywords.extend(keywords_from_path(&path));

    let mut seen = HashSet::new();
    keywords.retain(|k| {
        let len = k.chars().count();
        len > 2 && len < 50 && seen.insert(k.clone())
    });

    DocumentMetadata { title, description, keywords, category: category_from_path(&path) }
}

/// First category tag appearing as a `/<tag>/` path segment.
pub fn category_from_path(path: &str) -> Category {
    Category::KNOWN
        .into_iter()
        .find(|c| path.contains(&format!("/{}/", c.as_str())))
        .unwrap_or(Category::Unknown)
}

fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => {
            let path = url.replace('\\', "/");
            if path.starts_with('/') {
                path
            } else {
                format!("/{path}")
            }
        }
    }
}

/// Contents of fenced code blocks with the fence lines removed.
fn code_blocks(content: &str) -> String {
    CODE_BLOCK
        .find_iter(content)
        .map(|m| FENCE_LINE.replace_all(m.as_str(), " ").into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn headings(content: &str) -> String {
    content
        .lines()
        .filter(|line| HEADING_LINE.is_match(line))
        .map(|line| HEADING_LINE.replace(line, "").trim().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn keywords_from_text(text: &str) -> Vec<String> {
    let text = CODE_BLOCK.replace_all(text, "");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let clean = NON_WORD.replace_all(&text, " ").to_lowercase();

    let mut words: Vec<String> = clean
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect();
    words.extend(TECHNICAL_TERMS.iter().filter(|t| clean.contains(*t)).map(|t| t.to_string()));
    words
}

fn keywords_from_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|part| !part.is_empty())
        .map(|part| part.replace(['-', '_'], " ").to_lowercase())
        .collect()
}
