//! Heading-aware document chunking.
//!
//! A document that fits the token budget becomes a single chunk. Longer
//! documents are cut at markdown headings, tiny sections are discarded, and
//! the remaining sections are packed greedily back together up to the budget.
//! A section that alone exceeds the budget is split further at blank lines,
//! and a paragraph that still exceeds it is cut between words. The budget
//! covers the `# header` line each chunk's text is prefixed with.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::config::{DEFAULT_MAX_CHUNK_TOKENS, MIN_SECTION_CHARS};
use crate::tokenizer::{estimate_tokens, word_count};
use crate::DocumentId;

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"^(#{1,6})[ \t]+(.*\S)[ \t]*$").expect("valid regex");
    static ref BLANK_LINE: Regex = Regex::new(r"\n[ \t]*\n").expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: DocumentId,
    pub chunk_index: usize,
    /// `raw_text` prefixed with its nearest heading.
    pub text: String,
    pub raw_text: String,
    /// Heading titles from the document root (its title) down to this passage.
    pub header_path: Vec<String>,
    pub word_count: usize,
    /// Estimate for `text`, header included.
    pub estimated_tokens: usize,
    pub category: Category,
}

impl Chunk {
    fn new(document_id: DocumentId, chunk_index: usize, header_path: Vec<String>, raw_text: String, category: Category) -> Self {
        let nearest = header_path.last().map(String::as_str).unwrap_or_default();
        let text = format!("# {nearest}\n\n{raw_text}");
        Self {
            document_id,
            chunk_index,
            word_count: word_count(&raw_text),
            estimated_tokens: estimate_tokens(&text),
            text,
            raw_text,
            header_path,
            category,
        }
    }

    pub fn nearest_header(&self) -> &str {
        self.header_path.last().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    max_tokens: usize,
    min_section_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self { max_tokens: DEFAULT_MAX_CHUNK_TOKENS, min_section_chars: MIN_SECTION_CHARS }
    }
}

struct Section {
    header_path: Vec<String>,
    text: String,
}

struct Piece {
    header_path: Vec<String>,
    raw: String,
    tokens: usize,
}

impl Chunker {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens: max_tokens.max(1), ..Self::default() }
    }

    pub fn with_min_section_chars(mut self, min_chars: usize) -> Self {
        self.min_section_chars = min_chars;
        self
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn chunk(&self, document_id: DocumentId, title: &str, content: &str, category: Category) -> Vec<Chunk> {
        let whole = content.trim();
        if estimate_tokens(whole) <= self.content_budget(title) {
            return vec![Chunk::new(document_id, 0, vec![title.to_string()], whole.to_string(), category)];
        }

        let mut pieces: Vec<Piece> = Vec::new();
        let mut current: Option<Piece> = None;

        for section in self.sections(title, content) {
            let tokens = estimate_tokens(&section.text);
            let budget = self.content_budget(nearest(&section.header_path));
            if tokens > budget {
                pieces.extend(current.take());
                for (raw, tokens) in split_paragraphs(&section.text, budget) {
                    pieces.push(Piece { header_path: section.header_path.clone(), raw, tokens });
                }
                continue;
            }
            match current.as_mut() {
                Some(piece) if piece.tokens + tokens <= self.content_budget(nearest(&piece.header_path)) => {
                    piece.raw.push_str("\n\n");
                    piece.raw.push_str(&section.text);
                    piece.tokens += tokens;
                }
                _ => {
                    pieces.extend(current.take());
                    current = Some(Piece { header_path: section.header_path, raw: section.text, tokens });
                }
            }
        }
        pieces.extend(current);

        let before = pieces.len();
        pieces.retain(|p| p.raw.chars().count() > self.min_section_chars);
        if pieces.len() < before {
            tracing::debug!(document_id, dropped = before - pieces.len(), "dropped short paragraph splits");
        }

        if pieces.is_empty() {
            // Nothing survived the minimum-length filter; keep the document whole.
            return vec![Chunk::new(document_id, 0, vec![title.to_string()], whole.to_string(), category)];
        }

        pieces
            .into_iter()
            .enumerate()
            .map(|(i, p)| Chunk::new(document_id, i, p.header_path, p.raw, category))
            .collect()
    }

    fn sections(&self, title: &str, content: &str) -> Vec<Section> {
        let mut stack: Vec<String> = vec![title.to_string()];
        let mut sections = Vec::new();
        let mut path = stack.clone();
        let mut lines: Vec<&str> = Vec::new();
        let mut in_fence = false;

        for line in content.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
            } else if !in_fence {
                if let Some(caps) = HEADING.captures(line) {
                    self.push_section(&mut sections, std::mem::take(&mut path), &lines);
                    lines.clear();

                    let level = caps[1].len();
                    stack.truncate(level);
                    while stack.len() < level {
                        let inherited = stack.last().cloned().unwrap_or_default();
                        stack.push(inherited);
                    }
                    stack.push(caps[2].trim().to_string());
                    path = stack.clone();
                }
            }
            lines.push(line);
        }
        self.push_section(&mut sections, path, &lines);
        sections
    }

    fn push_section(&self, sections: &mut Vec<Section>, header_path: Vec<String>, lines: &[&str]) {
        let text = lines.join("\n").trim().to_string();
        if text.chars().count() <= self.min_section_chars {
            return;
        }
        sections.push(Section { header_path, text });
    }

    /// Tokens left for the passage once its `# header` prefix is counted.
    fn content_budget(&self, header: &str) -> usize {
        self.max_tokens.saturating_sub(estimate_tokens(&format!("# {header}\n\n"))).max(1)
    }
}

fn nearest(header_path: &[String]) -> &str {
    header_path.last().map(String::as_str).unwrap_or_default()
}

/// Greedy paragraph packing for an oversized section. Paragraphs over budget
/// are first cut between words.
fn split_paragraphs(text: &str, budget: usize) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0usize;

    let units = BLANK_LINE.split(text).map(str::trim).filter(|p| !p.is_empty()).flat_map(|p| {
        if estimate_tokens(p) > budget {
            split_words(p, budget)
        } else {
            vec![p.to_string()]
        }
    });
    for unit in units {
        let tokens = estimate_tokens(&unit);
        if !current.is_empty() && current_tokens + tokens > budget {
            out.push((std::mem::take(&mut current), current_tokens));
            current_tokens = 0;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&unit);
        current_tokens += tokens;
    }
    if !current.is_empty() {
        out.push((current, current_tokens));
    }
    out
}

/// Runs of whole words within `budget`. Only a single word longer than the
/// budget ends up over it.
fn split_words(paragraph: &str, budget: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0usize;
    for word in paragraph.split_inclusive(char::is_whitespace) {
        let tokens = estimate_tokens(word);
        if current_tokens > 0 && current_tokens + tokens > budget {
            out.push(current.trim().to_string());
            current.clear();
            current_tokens = 0;
        }
        current.push_str(word);
        current_tokens += tokens;
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filler(word: &str, n: usize) -> String {
        vec![word; n].join(" ")
    }

    #[test]
    fn small_document_is_one_chunk() {
        let chunks = Chunker::default().chunk(7, "Guide", "# Guide\n\nshort body", Category::Api);
        assert_eq!(chunks.len(), 1);
        let c = &chunks[0];
        assert_eq!(c.document_id, 7);
        assert_eq!(c.chunk_index, 0);
        assert_eq!(c.header_path, vec!["Guide".to_string()]);
        assert_eq!(c.text, "# Guide\n\n# Guide\n\nshort body");
        assert_eq!(c.category, Category::Api);
    }

    #[test]
    fn splits_on_headings_and_tracks_path() {
        let body = filler("alpha", 40);
        let content = format!(
            "# Intro\n{body}\n## Setup\n{body}\n#### Deep\n{body}\n## Tiny\nsmall\n"
        );
        let chunks = Chunker::new(60).chunk(0, "Doc", &content, Category::Dev);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].header_path, vec!["Doc", "Intro"]);
        assert_eq!(chunks[1].header_path, vec!["Doc", "Intro", "Setup"]);
        // level 3 is missing and inherits "Setup"
        assert_eq!(chunks[2].header_path, vec!["Doc", "Intro", "Setup", "Setup", "Deep"]);
        assert!(chunks[2].text.starts_with("# Deep\n\n#### Deep"));
        assert!(chunks.iter().all(|c| !c.raw_text.contains("small")));
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
        }
    }

    #[test]
    fn packs_small_sections_together() {
        let body = filler("beta", 30);
        let content = format!("# A\n{body}\n# B\n{body}\n# C\n{body}\n# D\n{body}");
        // each section is ~31 tokens, two fit in 80
        let chunks = Chunker::new(80).chunk(1, "Doc", &content, Category::Unknown);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].raw_text.starts_with("# A") && chunks[0].raw_text.contains("# B"));
        assert_eq!(chunks[0].header_path, vec!["Doc", "A"]);
        assert!(chunks[1].raw_text.starts_with("# C"));
    }

    #[test]
    fn oversized_section_splits_by_paragraph() {
        let para = filler("gamma", 40);
        let content = format!("# Big\n{para}\n\n{para}\n\n{para}\n\n{para}");
        let chunker = Chunker::new(130);
        let chunks = chunker.chunk(2, "Doc", &content, Category::Api);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.estimated_tokens <= chunker.max_tokens());
            assert_eq!(c.header_path, vec!["Doc", "Big"]);
        }
    }

    #[test]
    fn headings_inside_code_fences_are_ignored() {
        let body = filler("delta", 40);
        let content = format!("# Real\n{body}\n```bash\n# not a heading\necho hi\n```\n{body}");
        let chunks = Chunker::new(40).chunk(3, "Doc", &content, Category::Api);
        assert!(chunks.iter().all(|c| c.nearest_header() != "not a heading"));
    }

    #[test]
    fn all_sections_too_short_falls_back_to_whole_document() {
        let content = (0..40).map(|i| format!("# H{i}\nword")).collect::<Vec<_>>().join("\n");
        let chunks = Chunker::new(10).chunk(4, "Doc", &content, Category::Api);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].raw_text, content.trim());
    }

    #[test]
    fn header_prefix_counts_against_the_budget() {
        let chunker = Chunker::new(60);
        let chunks = chunker.chunk(0, "A Fairly Long Document Title Here", &"abcd ".repeat(60), Category::Api);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.estimated_tokens <= chunker.max_tokens(), "{} > 60", c.estimated_tokens);
        }
    }

    #[test]
    fn long_paragraph_is_cut_between_words() {
        let content = format!("# Wall\n{}", filler("epsilon", 200));
        let chunker = Chunker::new(120);
        let chunks = chunker.chunk(5, "Doc", &content, Category::Api);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.estimated_tokens <= chunker.max_tokens());
            assert!(c.raw_text.split_whitespace().all(|w| w == "epsilon" || w == "#" || w == "Wall"));
        }
    }

    #[test]
    fn section_of_exactly_min_length_is_dropped() {
        let exact = "x".repeat(MIN_SECTION_CHARS);
        let kept = filler("zeta", 60);
        let content = format!("# Exact\n{}\n# Kept\n{kept}", &exact[..MIN_SECTION_CHARS - "# Exact\n".len()]);
        let chunks = Chunker::new(40).chunk(6, "Doc", &content, Category::Api);
        assert!(chunks.iter().all(|c| c.nearest_header() != "Exact"));
        assert!(chunks.iter().all(|c| c.raw_text.chars().count() > MIN_SECTION_CHARS));
    }
}
