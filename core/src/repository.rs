//! The ranked-search entry point.
//!
//! A [`DocsRepository`] owns two partitions of documents. Searchable documents
//! are indexed and ranked; reference documents are only reachable by id and
//! through similarity lookups. Both are immutable once the repository exists,
//! so queries never block each other. The synonym table and weight tables sit
//! behind `RwLock`s and may be tuned while the repository is serving.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::bm25::{Bm25Calculator, Bm25Result};
use crate::category::Category;
use crate::chunker::{Chunk, Chunker};
use crate::config::{SearchOptions, MAX_RELEVANT_CHUNKS, SIMILARITY_THRESHOLD};
use crate::document::{Document, SourceDocument};
use crate::index::DocumentFrequencyIndex;
use crate::synonyms::SynonymDictionary;
use crate::tokenizer::{normalize_query, TermMatcher};
use crate::weights::{WeightBreakdown, WeightCalculator};
use crate::DocumentId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub document_id: DocumentId,
    /// Final score: weighted, or plain BM25 when weighting is off.
    pub score: f64,
    pub bm25_score: f64,
    pub relevant_chunks: Vec<Chunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_breakdown: Option<WeightBreakdown>,
}

/// Counts reported by [`DocsRepository::stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryStats {
    pub total_documents: usize,
    pub searchable_documents: usize,
    pub reference_documents: usize,
    pub indexed_terms: usize,
    pub total_chunks: usize,
    pub categories: Vec<Category>,
}

struct Candidate {
    document_id: DocumentId,
    score: f64,
    bm25_score: f64,
    breakdown: Option<WeightBreakdown>,
}

pub struct DocsRepository {
    /// Searchable documents first, then reference documents.
    documents: Vec<Document>,
    searchable_len: usize,
    positions: HashMap<DocumentId, usize>,
    index: DocumentFrequencyIndex,
    synonyms: RwLock<SynonymDictionary>,
    weights: RwLock<WeightCalculator>,
}

impl Default for DocsRepository {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl DocsRepository {
    /// Build over already constructed documents. Ids should be unique across
    /// both partitions; for a duplicated id only the first document is
    /// reachable through [`get_document_by_id`](Self::get_document_by_id).
    pub fn new(searchable: Vec<Document>, reference: Vec<Document>) -> Self {
        let index = DocumentFrequencyIndex::build(&searchable);
        let searchable_len = searchable.len();
        let mut documents = searchable;
        documents.extend(reference);

        let mut positions = HashMap::with_capacity(documents.len());
        for (pos, doc) in documents.iter().enumerate() {
            match positions.entry(doc.id()) {
                Entry::Vacant(slot) => {
                    slot.insert(pos);
                }
                Entry::Occupied(_) => tracing::warn!(document_id = doc.id(), "duplicate document id ignored"),
            }
        }

        tracing::info!(
            searchable = searchable_len,
            reference = documents.len() - searchable_len,
            terms = index.num_terms(),
            "repository ready"
        );
        Self {
            documents,
            searchable_len,
            positions,
            index,
            synonyms: RwLock::new(SynonymDictionary::new()),
            weights: RwLock::new(WeightCalculator::default()),
        }
    }

    /// Assign sequential ids (searchable first, then reference) and chunk with
    /// the default budget.
    pub fn from_sources(searchable: Vec<SourceDocument>, reference: Vec<SourceDocument>) -> Self {
        Self::from_sources_with(searchable, reference, &Chunker::default())
    }

    pub fn from_sources_with(searchable: Vec<SourceDocument>, reference: Vec<SourceDocument>, chunker: &Chunker) -> Self {
        let offset = searchable.len();
        let searchable: Vec<Document> = searchable
            .into_iter()
            .enumerate()
            .map(|(i, source)| Document::with_chunker(i as DocumentId, source, chunker))
            .collect();
        let reference: Vec<Document> = reference
            .into_iter()
            .enumerate()
            .map(|(i, source)| Document::with_chunker((offset + i) as DocumentId, source, chunker))
            .collect();
        Self::new(searchable, reference)
    }

    pub fn with_synonyms(self, synonyms: SynonymDictionary) -> Self {
        *self.synonyms.write() = synonyms;
        self
    }

    pub fn with_weights(self, weights: WeightCalculator) -> Self {
        *self.weights.write() = weights;
        self
    }

    /// Rank the searchable documents against `query`.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        let options = options.clone().validated();
        let terms = normalize_query(query);
        if terms.is_empty() {
            return Vec::new();
        }
        let terms = if options.use_synonyms { self.synonyms.read().expand(&terms) } else { terms };
        tracing::debug!(query, ?terms, mode = %options.mode, "search");

        let matchers: Vec<TermMatcher> = terms.iter().map(|t| TermMatcher::new(t)).collect();
        let searchable = self.searchable();
        let mut scored = Bm25Calculator::new(searchable, &self.index).calculate_with(&matchers, options.mode);
        if let Some(category) = options.category {
            scored.retain(|r| self.document_category(r.document_id) == Some(category));
        }

        let mut candidates: Vec<Candidate> = if options.use_weights {
            self.weights
                .read()
                .apply(&scored, searchable, &terms)
                .into_iter()
                .map(|w| Candidate {
                    document_id: w.document_id,
                    score: w.final_score,
                    bm25_score: w.bm25_score,
                    breakdown: Some(w.breakdown),
                })
                .collect()
        } else {
            scored.iter().map(Candidate::unweighted).collect()
        };

        if let Some(min_score) = options.min_score {
            candidates.retain(|c| c.score >= min_score);
        }
        if !options.keywords.is_empty() {
            candidates.retain(|c| {
                self.get_document_by_id(c.document_id)
                    .is_some_and(|doc| options.keywords.iter().any(|k| doc.has_keyword(k)))
            });
        }
        if options.relative_cutoff {
            if let Some(top) = candidates.first().map(|c| c.score) {
                let floor = top * options.mode.min_score_ratio();
                candidates.retain(|c| c.score >= floor);
            }
        }
        candidates.truncate(options.limit);

        let results: Vec<SearchResult> = candidates
            .into_iter()
            .map(|c| SearchResult {
                relevant_chunks: self
                    .get_document_by_id(c.document_id)
                    .map(|doc| doc.relevant_chunks(&matchers, MAX_RELEVANT_CHUNKS).into_iter().cloned().collect())
                    .unwrap_or_default(),
                document_id: c.document_id,
                score: c.score,
                bm25_score: c.bm25_score,
                weight_breakdown: c.breakdown,
            })
            .collect();
        tracing::debug!(hits = results.len(), "search complete");
        results
    }

    /// Looks in both partitions.
    pub fn get_document_by_id(&self, id: DocumentId) -> Option<&Document> {
        self.positions.get(&id).map(|&pos| &self.documents[pos])
    }

    /// Documents whose keyword sets overlap the given one by a Jaccard index
    /// above the similarity threshold, most similar first. Unknown id yields
    /// an empty list.
    pub fn similar_documents(&self, id: DocumentId, limit: usize) -> Vec<&Document> {
        self.similar_documents_scored(id, limit).into_iter().map(|(doc, _)| doc).collect()
    }

    pub fn similar_documents_scored(&self, id: DocumentId, limit: usize) -> Vec<(&Document, f64)> {
        let Some(target) = self.get_document_by_id(id) else {
            return Vec::new();
        };
        let mut similar: Vec<(&Document, f64)> = self
            .documents
            .iter()
            .filter(|doc| doc.id() != id)
            .map(|doc| (doc, target.keyword_similarity(doc)))
            .filter(|(_, similarity)| *similarity > SIMILARITY_THRESHOLD)
            .collect();
        similar.sort_by(|a, b| b.1.total_cmp(&a.1));
        similar.truncate(limit);
        similar
    }

    pub fn documents_by_category(&self, category: Category) -> Vec<&Document> {
        self.documents.iter().filter(|d| d.category() == category).collect()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<Category> {
        let mut out: Vec<Category> = Vec::new();
        for doc in &self.documents {
            if !out.contains(&doc.category()) {
                out.push(doc.category());
            }
        }
        out
    }

    pub fn total_documents(&self) -> usize {
        self.documents.len()
    }

    pub fn searchable_documents(&self) -> &[Document] {
        self.searchable()
    }

    pub fn reference_documents(&self) -> &[Document] {
        &self.documents[self.searchable_len..]
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn index(&self) -> &DocumentFrequencyIndex {
        &self.index
    }

    pub fn synonyms(&self) -> RwLockReadGuard<'_, SynonymDictionary> {
        self.synonyms.read()
    }

    pub fn synonyms_mut(&self) -> RwLockWriteGuard<'_, SynonymDictionary> {
        self.synonyms.write()
    }

    pub fn weights(&self) -> RwLockReadGuard<'_, WeightCalculator> {
        self.weights.read()
    }

    pub fn weights_mut(&self) -> RwLockWriteGuard<'_, WeightCalculator> {
        self.weights.write()
    }

    pub fn stats(&self) -> RepositoryStats {
        RepositoryStats {
            total_documents: self.total_documents(),
            searchable_documents: self.searchable_len,
            reference_documents: self.documents.len() - self.searchable_len,
            indexed_terms: self.index.num_terms(),
            total_chunks: self.documents.iter().map(|d| d.chunks().len()).sum(),
            categories: self.categories(),
        }
    }

    fn searchable(&self) -> &[Document] {
        &self.documents[..self.searchable_len]
    }

    fn document_category(&self, id: DocumentId) -> Option<Category> {
        self.get_document_by_id(id).map(Document::category)
    }
}

impl Candidate {
    fn unweighted(result: &Bm25Result) -> Self {
        Self { document_id: result.document_id, score: result.score, bm25_score: result.score, breakdown: None }
    }
}
