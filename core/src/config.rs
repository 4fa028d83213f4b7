//! Tuning constants and per-query configuration.
//!
//! Everything the ranking pipeline needs to know about limits and formula
//! parameters lives here. Runtime configuration of the binaries is handled by
//! their CLI arguments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::category::Category;

/// Fixed average document length (characters) used for BM25 length
/// normalization. This is intentionally not measured from the corpus; the
/// weight tables and score thresholds are tuned against it.
pub const BM25_AVG_DOC_LENGTH: f64 = 1000.0;

/// Lower bound applied to the BM25 inverse document frequency.
///
/// `ln((N - df + 0.5) / (df + 0.5))` goes negative once a term appears in more
/// than half the scored documents. Flooring keeps such terms contributing a
/// small positive amount instead of pushing matching documents out.
pub const MIN_IDF: f64 = 0.1;

/// Default token budget per chunk.
pub const DEFAULT_MAX_CHUNK_TOKENS: usize = 2000;

/// Sections (and paragraph splits) shorter than this many characters are dropped.
pub const MIN_SECTION_CHARS: usize = 100;

/// Maximum number of excerpt chunks attached to each search result.
pub const MAX_RELEVANT_CHUNKS: usize = 3;

/// Default number of results returned by a search.
pub const DEFAULT_LIMIT: usize = 5;

/// Hard upper bound for `SearchOptions::limit`.
pub const MAX_LIMIT: usize = 100;

/// Keyword-set Jaccard index a document must exceed to count as similar.
pub const SIMILARITY_THRESHOLD: f64 = 0.1;

/// Default number of similar documents returned.
pub const DEFAULT_SIMILAR_LIMIT: usize = 3;

/// Multiplier caps for the keyword and context weight products.
pub const MAX_KEYWORD_WEIGHT: f64 = 2.0;
pub const MAX_CONTEXT_WEIGHT: f64 = 2.0;

/// Context multipliers for a query term found in the title / description.
pub const TITLE_MATCH_WEIGHT: f64 = 1.5;
pub const DESCRIPTION_MATCH_WEIGHT: f64 = 1.2;

/// BM25 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f64,
    /// Length normalization strength.
    pub b: f64,
}

/// Scoring aggressiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Less sensitive to repeated terms and document length.
    Broad,
    #[default]
    Balanced,
    /// More sensitive to repeated terms and document length.
    Precise,
}

impl SearchMode {
    pub const ALL: [SearchMode; 3] = [SearchMode::Broad, SearchMode::Balanced, SearchMode::Precise];

    pub fn params(self) -> Bm25Params {
        match self {
            SearchMode::Broad => Bm25Params { k1: 1.0, b: 0.5 },
            SearchMode::Balanced => Bm25Params { k1: 1.2, b: 0.75 },
            SearchMode::Precise => Bm25Params { k1: 1.5, b: 0.9 },
        }
    }

    /// Fraction of the top score below which a result is considered noise.
    /// Only applied when a caller opts in via `SearchOptions::relative_cutoff`.
    pub fn min_score_ratio(self) -> f64 {
        match self {
            SearchMode::Broad => 0.3,
            SearchMode::Balanced => 0.7,
            SearchMode::Precise => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Broad => "broad",
            SearchMode::Balanced => "balanced",
            SearchMode::Precise => "precise",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "broad" => Ok(SearchMode::Broad),
            "balanced" => Ok(SearchMode::Balanced),
            "precise" => Ok(SearchMode::Precise),
            other => Err(anyhow::anyhow!("unknown search mode: {other}")),
        }
    }
}

/// Options for `DocsRepository::search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Results scoring below this are dropped.
    pub min_score: Option<f64>,
    pub limit: usize,
    pub mode: SearchMode,
    pub use_weights: bool,
    pub use_synonyms: bool,
    /// Restrict results to one category.
    pub category: Option<Category>,
    /// Keep only documents containing at least one of these keywords.
    pub keywords: Vec<String>,
    /// Drop results scoring below `top * mode.min_score_ratio()`.
    pub relative_cutoff: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            min_score: None,
            limit: DEFAULT_LIMIT,
            mode: SearchMode::Balanced,
            use_weights: true,
            use_synonyms: true,
            category: None,
            keywords: Vec::new(),
            relative_cutoff: false,
        }
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn use_weights(mut self, enabled: bool) -> Self {
        self.use_weights = enabled;
        self
    }

    pub fn use_synonyms(mut self, enabled: bool) -> Self {
        self.use_synonyms = enabled;
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn relative_cutoff(mut self, enabled: bool) -> Self {
        self.relative_cutoff = enabled;
        self
    }

    /// Normalizes the options once at the query boundary: a zero limit falls
    /// back to [`DEFAULT_LIMIT`] and larger ones are capped at `MAX_LIMIT`, a non-finite or negative minimum score is ignored and
    /// keyword filters are case-folded with blanks removed.
    pub fn validated(mut self) -> Self {
        self.limit = match self.limit {
            0 => DEFAULT_LIMIT,
            n => n.min(MAX_LIMIT),
        };
        self.min_score = self.min_score.filter(|s| s.is_finite() && *s >= 0.0);
        self.keywords = self
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }
}
