//! BM25 Okapi scoring over a fixed document set.
//!
//! Term frequencies are counted per query (whole-word matches in the content);
//! document frequencies come from the prebuilt [`DocumentFrequencyIndex`].
//! Length normalization uses the fixed [`BM25_AVG_DOC_LENGTH`].

use serde::Serialize;

use crate::config::{Bm25Params, SearchMode, BM25_AVG_DOC_LENGTH, MIN_IDF};
use crate::document::Document;
use crate::index::DocumentFrequencyIndex;
use crate::tokenizer::TermMatcher;
use crate::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bm25Result {
    pub document_id: DocumentId,
    pub score: f64,
}

pub struct Bm25Calculator<'a> {
    documents: &'a [Document],
    index: &'a DocumentFrequencyIndex,
}

impl<'a> Bm25Calculator<'a> {
    pub fn new(documents: &'a [Document], index: &'a DocumentFrequencyIndex) -> Self {
        Self { documents, index }
    }

    /// Score every document against `terms`. Documents without a positive
    /// score are left out; the rest come back best first, ties in document order.
    pub fn calculate(&self, terms: &[String], mode: SearchMode) -> Vec<Bm25Result> {
        let matchers: Vec<TermMatcher> = terms
            .iter()
            .map(|t| TermMatcher::new(t))
            .filter(|m| !m.term().is_empty())
            .collect();
        self.calculate_with(&matchers, mode)
    }

    /// Same as [`calculate`](Self::calculate) with terms already compiled.
    pub fn calculate_with(&self, matchers: &[TermMatcher], mode: SearchMode) -> Vec<Bm25Result> {
        if matchers.is_empty() || self.documents.is_empty() {
            return Vec::new();
        }
        let params = mode.params();
        let mut results: Vec<Bm25Result> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let score = self.score_document(doc, matchers, params);
                (score > 0.0).then_some(Bm25Result { document_id: doc.id(), score })
            })
            .collect();
        // stable: equal scores keep document order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results
    }

    pub fn score_document(&self, doc: &Document, matchers: &[TermMatcher], params: Bm25Params) -> f64 {
        let Bm25Params { k1, b } = params;
        let n = self.documents.len() as f64;
        let length_ratio = doc.content_length() as f64 / BM25_AVG_DOC_LENGTH;

        let mut score = 0.0;
        for matcher in matchers {
            let tf = doc.term_frequency(matcher);
            if tf == 0 {
                continue;
            }
            let tf = tf as f64;
            let df = self.index.frequency(matcher.term()) as f64;
            let idf = idf(n, df);
            let tf_norm = (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * length_ratio));
            score += idf * tf_norm;
        }
        score
    }
}

/// `ln((N - df + 0.5) / (df + 0.5))`, floored at [`MIN_IDF`].
pub fn idf(n: f64, df: f64) -> f64 {
    ((n - df + 0.5) / (df + 0.5)).ln().max(MIN_IDF)
}
