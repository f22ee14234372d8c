//! Knowledge retrieval for the lead qualification agent
//!
//! Documents are loaded once at startup from YAML/JSON files and indexed by
//! keyword. Lookups are in-memory and never fail: a query with no keyword
//! hit falls back to the first documents of the corpus.

pub mod knowledge_loader;
pub mod retriever;

pub use knowledge_loader::{KnowledgeDocument, KnowledgeFile, KnowledgeLoader};
pub use retriever::{KnowledgeRetriever, ScoredDocument, CONTEXT_HEADER};

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Index error: {0}")]
    Index(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<RagError> for lead_agent_core::Error {
    fn from(err: RagError) -> Self {
        lead_agent_core::Error::Rag(err.to_string())
    }
}
