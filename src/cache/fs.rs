//! Filesystem snapshot store
//!
//! One JSON document per root, written under a cache directory. Files are
//! keyed by the SHA-256 of the root identifier so arbitrary URLs map to
//! safe, fixed-length names.

use crate::cache::{GraphStore, StoreResult};
use crate::graph::DocumentGraph;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Default cache directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = ".weft-cache";

/// Snapshot store backed by a directory of JSON files
#[derive(Debug, Clone)]
pub struct FsGraphStore {
    dir: PathBuf,
}

impl FsGraphStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn snapshot_path(&self, root_id: &str) -> PathBuf {
        let digest = Sha256::digest(root_id.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }
}

impl Default for FsGraphStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

#[async_trait]
impl GraphStore for FsGraphStore {
    async fn load(&self, root_id: &str) -> Option<DocumentGraph> {
        let path = self.snapshot_path(root_id);

        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(error) => {
                tracing::debug!("no snapshot at {}: {}", path.display(), error);
                return None;
            }
        };

        match DocumentGraph::from_json(&data) {
            Ok(graph) => Some(graph),
            Err(error) => {
                tracing::debug!("discarding corrupt snapshot {}: {}", path.display(), error);
                None
            }
        }
    }

    async fn save(&self, root_id: &str, graph: &DocumentGraph) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = graph.to_json()?;
        tokio::fs::write(self.snapshot_path(root_id), json).await?;
        Ok(())
    }
}
