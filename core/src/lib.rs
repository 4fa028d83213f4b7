pub mod bm25;
pub mod category;
pub mod chunker;
pub mod config;
pub mod document;
pub mod index;
pub mod repository;
pub mod synonyms;
pub mod tokenizer;
pub mod weights;

/// Sequential document handle assigned at load time.
pub type DocumentId = u32;

pub use category::Category;
pub use chunker::{Chunk, Chunker};
pub use config::{SearchMode, SearchOptions};
pub use document::{Document, DocumentMetadata, DocumentSummary, SourceDocument};
pub use repository::{DocsRepository, RepositoryStats, SearchResult};
pub use synonyms::SynonymDictionary;
pub use weights::{WeightBreakdown, WeightCalculator, WeightOverrides};
