//! Crawl snapshot persistence
//!
//! The orchestrator loads the previous crawl's graph through the
//! [`GraphStore`] contract to source revalidation candidates, and persists
//! the finished graph through it on successful completion. Missing or
//! unreadable snapshots are always a cache miss, never an error.

mod fs;

pub use fs::{FsGraphStore, DEFAULT_CACHE_DIR};

use crate::graph::DocumentGraph;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur while persisting a snapshot
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for snapshot store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Contract for prior-crawl snapshot storage
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Returns the last successfully persisted graph for this root, or
    /// `None` if none exists or it is unreadable
    async fn load(&self, root_id: &str) -> Option<DocumentGraph>;

    /// Persists the full graph, replacing any prior snapshot for the same
    /// root
    ///
    /// Only called after a crawl completes without a root-fetch failure;
    /// never called on early cancellation of a streamed crawl.
    async fn save(&self, root_id: &str, graph: &DocumentGraph) -> StoreResult<()>;
}

/// In-memory snapshot store
///
/// Backs tests and cache-less runs; snapshots live as long as the store.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    snapshots: Mutex<HashMap<String, DocumentGraph>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a snapshot exists for this root
    pub fn contains(&self, root_id: &str) -> bool {
        self.snapshots.lock().unwrap().contains_key(root_id)
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn load(&self, root_id: &str) -> Option<DocumentGraph> {
        self.snapshots.lock().unwrap().get(root_id).cloned()
    }

    async fn save(&self, root_id: &str, graph: &DocumentGraph) -> StoreResult<()> {
        self.snapshots
            .lock()
            .unwrap()
            .insert(root_id.to_string(), graph.clone());
        Ok(())
    }
}
