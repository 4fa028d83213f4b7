//! Domain weighting applied on top of BM25.
//!
//! `final = bm25 * category * keyword * context`, with the keyword and context
//! products each capped. Tables are owned by the calculator: callers inject
//! overrides at construction and may update entries afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::bm25::Bm25Result;
use crate::category::Category;
use crate::config::{DESCRIPTION_MATCH_WEIGHT, MAX_CONTEXT_WEIGHT, MAX_KEYWORD_WEIGHT, TITLE_MATCH_WEIGHT};
use crate::document::Document;
use crate::DocumentId;

const DEFAULT_CATEGORY_WEIGHTS: &[(Category, f64)] = &[
    (Category::Api, 1.3),
    (Category::Templates, 1.2),
    (Category::Security, 1.1),
    (Category::Examples, 1.0),
    (Category::Frameworks, 1.0),
    (Category::Dev, 1.0),
    (Category::Config, 0.9),
    (Category::Errors, 0.8),
    (Category::Unknown, 0.7),
];

const DEFAULT_KEYWORD_WEIGHTS: &[(&str, f64)] = &[
    ("login", 1.5),
    ("signup", 1.5),
    ("auth", 1.3),
    ("authentication", 1.3),
    ("info", 1.3),
    ("인증", 1.5),
    ("로그인", 1.5),
    ("회원가입", 1.5),
    ("사용자정보", 1.3),
    ("사용자", 1.3),
    ("cookie", 1.2),
    ("token", 1.2),
    ("user", 1.2),
    ("profile", 1.2),
    ("account", 1.2),
    ("register", 1.2),
    ("signin", 1.2),
];

const NEUTRAL_WEIGHT: f64 = 1.0;

/// Replacement entries merged over the built-in tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightOverrides {
    pub category: HashMap<Category, f64>,
    pub keyword: HashMap<String, f64>,
}

/// Multipliers applied to one result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightBreakdown {
    pub category_weight: f64,
    pub keyword_weight: f64,
    pub context_weight: f64,
}

impl WeightBreakdown {
    pub const NEUTRAL: WeightBreakdown = WeightBreakdown {
        category_weight: NEUTRAL_WEIGHT,
        keyword_weight: NEUTRAL_WEIGHT,
        context_weight: NEUTRAL_WEIGHT,
    };

    pub fn combined(&self) -> f64 {
        self.category_weight * self.keyword_weight * self.context_weight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightedResult {
    pub document_id: DocumentId,
    pub bm25_score: f64,
    pub breakdown: WeightBreakdown,
    pub final_score: f64,
}

#[derive(Debug, Clone)]
pub struct WeightCalculator {
    category_weights: HashMap<Category, f64>,
    keyword_weights: HashMap<String, f64>,
}

impl Default for WeightCalculator {
    fn default() -> Self {
        Self::new(WeightOverrides::default())
    }
}

impl WeightCalculator {
    pub fn new(overrides: WeightOverrides) -> Self {
        let mut category_weights: HashMap<Category, f64> = DEFAULT_CATEGORY_WEIGHTS.iter().copied().collect();
        category_weights.extend(overrides.category);

        let mut keyword_weights: HashMap<String, f64> =
            DEFAULT_KEYWORD_WEIGHTS.iter().map(|&(k, w)| (k.to_string(), w)).collect();
        keyword_weights.extend(overrides.keyword.into_iter().map(|(k, w)| (k.trim().to_lowercase(), w)));

        Self { category_weights, keyword_weights }
    }

    /// Weight every result and re-sort best first. Results whose document is
    /// missing from `documents` keep their BM25 score.
    pub fn apply(&self, results: &[Bm25Result], documents: &[Document], terms: &[String]) -> Vec<WeightedResult> {
        let by_id: HashMap<DocumentId, &Document> = documents.iter().map(|d| (d.id(), d)).collect();
        let terms: Vec<String> = terms.iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()).collect();

        let mut weighted: Vec<WeightedResult> = results
            .iter()
            .map(|r| {
                let breakdown = match by_id.get(&r.document_id) {
                    Some(doc) => self.breakdown(doc, &terms),
                    None => {
                        tracing::warn!(document_id = r.document_id, "document not found while weighting");
                        WeightBreakdown::NEUTRAL
                    }
                };
                WeightedResult {
                    document_id: r.document_id,
                    bm25_score: r.score,
                    breakdown,
                    final_score: r.score * breakdown.combined(),
                }
            })
            .collect();
        weighted.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        weighted
    }

    /// Multipliers for one document; `terms` must be lower-cased.
    pub fn breakdown(&self, document: &Document, terms: &[String]) -> WeightBreakdown {
        WeightBreakdown {
            category_weight: self.category_weight(document.category()),
            keyword_weight: self.keyword_weight(document, terms),
            context_weight: context_weight(document, terms),
        }
    }

    pub fn category_weight(&self, category: Category) -> f64 {
        self.category_weights.get(&category).copied().unwrap_or(NEUTRAL_WEIGHT)
    }

    pub fn keyword_multiplier(&self, term: &str) -> f64 {
        self.keyword_weights.get(term).copied().unwrap_or(NEUTRAL_WEIGHT)
    }

    fn keyword_weight(&self, document: &Document, terms: &[String]) -> f64 {
        let product: f64 = terms
            .iter()
            .filter(|t| document.has_keyword(t))
            .map(|t| self.keyword_multiplier(t))
            .product();
        product.min(MAX_KEYWORD_WEIGHT)
    }

    pub fn update_category_weight(&mut self, category: Category, weight: f64) {
        self.category_weights.insert(category, weight);
    }

    pub fn update_keyword_weight(&mut self, keyword: &str, weight: f64) {
        self.keyword_weights.insert(keyword.trim().to_lowercase(), weight);
    }

    pub fn category_weights(&self) -> &HashMap<Category, f64> {
        &self.category_weights
    }

    pub fn keyword_weights(&self) -> &HashMap<String, f64> {
        &self.keyword_weights
    }

    /// Largest category multiplier currently configured.
    pub fn max_category_weight(&self) -> f64 {
        self.category_weights.values().copied().fold(NEUTRAL_WEIGHT, f64::max)
    }
}

fn context_weight(document: &Document, terms: &[String]) -> f64 {
    let title = document.title().to_lowercase();
    let description = document.description().to_lowercase();
    let mut weight = NEUTRAL_WEIGHT;
    for term in terms {
        if title.contains(term.as_str()) {
            weight *= TITLE_MATCH_WEIGHT;
        }
        if description.contains(term.as_str()) {
            weight *= DESCRIPTION_MATCH_WEIGHT;
        }
    }
    weight.min(MAX_CONTEXT_WEIGHT)
}
