use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::document::Document;
use crate::tokenizer::index_terms;

/// Term -> number of documents containing it at least once.
///
/// Built once over the searchable documents; never updated afterwards.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DocumentFrequencyIndex {
    df: HashMap<String, u32>,
    num_docs: u32,
}

impl DocumentFrequencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut index = Self::new();
        for doc in documents {
            let mut unique: HashSet<String> = doc.keywords().iter().map(|k| k.to_lowercase()).collect();
            unique.extend(index_terms(doc.content()));
            for term in unique {
                *index.df.entry(term).or_insert(0) += 1;
            }
            index.num_docs += 1;
        }
        tracing::debug!(num_docs = index.num_docs, num_terms = index.df.len(), "built document frequency index");
        index
    }

    /// Raw document frequency, `None` for unseen terms.
    pub fn get(&self, term: &str) -> Option<u32> {
        self.df.get(term).copied()
    }

    /// Document frequency with unseen terms treated as appearing once.
    pub fn frequency(&self, term: &str) -> u32 {
        self.get(term).unwrap_or(1)
    }

    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    pub fn num_terms(&self) -> usize {
        self.df.len()
    }
}
