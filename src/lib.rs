//! Weft: a linked-document text aggregator
//!
//! This crate crawls a linked document collection breadth-first from one root
//! resource, sanitizes each fetched document into clean text, and weaves the
//! reachable content into a single ordered body suitable for feeding to a
//! language model. Crawl results are recorded in a document graph that can be
//! persisted and revalidated on later runs.

pub mod cache;
pub mod crawler;
pub mod fetch;
pub mod graph;
pub mod sanitize;

use thiserror::Error;

/// Main error type for Weft operations
#[derive(Debug, Error)]
pub enum WeftError {
    #[error("failed to fetch root resource {url}: {source}")]
    Root {
        url: String,
        source: fetch::TransportError,
    },

    #[error("invalid root URL {url}: {source}")]
    InvalidRootUrl {
        url: String,
        source: ::url::ParseError,
    },

    #[error("crawl cancelled by consumer")]
    Cancelled,

    #[error("crawl worker failed: {0}")]
    Worker(String),

    #[error("cache error: {0}")]
    Store(#[from] cache::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Weft operations
pub type Result<T> = std::result::Result<T, WeftError>;

// Re-export commonly used types
pub use cache::{FsGraphStore, GraphStore, MemoryGraphStore};
pub use crawler::{NodeStream, Resolved, Resolver, ResolverConfig};
pub use fetch::{HttpTransport, Method, Transport, TransportError, TransportResponse};
pub use graph::{
    ContentKind, DocumentGraph, GraphNode, NodeOutcome, OutboundLink, TraversalOrder, Validators,
};
pub use sanitize::{sanitize, sniff_kind, Sanitized};
