//! Content-hash cache of generated motion clips.
//!
//! One manifest per project maps a scene index to the hash of the inputs the
//! clip was generated from and the clip file. An entry only counts while the
//! file still exists, so deleting a clip by hand forces regeneration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::metrics;

/// Hex characters of the digest kept as the cache key.
const HASH_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Corrupt clip cache manifest {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub path: PathBuf,
}

/// Clip cache for one project, backed by a JSON manifest.
#[derive(Debug, Clone)]
pub struct ClipCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl ClipCache {
    /// Hash of the inputs a clip is generated from.
    pub fn compute_hash(visual_description: &str, title: &str, clip_seconds: u32) -> String {
        let digest = Sha256::digest(format!("{}|{}|{}", visual_description, title, clip_seconds));
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        hex[..HASH_LEN].to_string()
    }

    /// Load the manifest. A missing, unreadable or corrupt manifest yields an
    /// empty cache.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::try_load(&path).await {
            Ok(cache) => cache,
            Err(e) => {
                warn!("Ignoring clip cache: {}", e);
                if matches!(e, CacheError::Corrupt { .. }) {
                    metrics::record_cache_corrupt();
                }
                Self {
                    path,
                    entries: BTreeMap::new(),
                }
            }
        }
    }

    pub async fn try_load(path: &Path) -> Result<Self, CacheError> {
        let entries = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| CacheError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// True iff an entry exists for `index` with this hash and `path` exists.
    pub fn is_valid(&self, index: usize, hash: &str, path: &Path) -> bool {
        self.entries
            .get(&index.to_string())
            .is_some_and(|entry| entry.hash == hash)
            && path.exists()
    }

    pub fn get(&self, index: usize) -> Option<&CacheEntry> {
        self.entries.get(&index.to_string())
    }

    /// Upsert an entry and persist the manifest. A failed write is logged
    /// and leaves the in-memory entry in place.
    pub async fn set(&mut self, index: usize, hash: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(
            index.to_string(),
            CacheEntry {
                hash: hash.into(),
                path: path.into(),
            },
        );
        if let Err(e) = self.persist().await {
            warn!(manifest = %self.path.display(), "Failed to persist clip cache: {}", e);
        }
    }

    async fn persist(&self) -> Result<(), CacheError> {
        let json = serde_json::to_vec_pretty(&self.entries).map_err(|source| CacheError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(manifest = %self.path.display(), entries = self.entries.len(), "Clip cache saved");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_is_deterministic() {
        let a = ClipCache::compute_hash("a cell dividing", "Mitosis", 6);
        let b = ClipCache::compute_hash("a cell dividing", "Mitosis", 6);
        assert_eq!(a, b);
        assert_eq!(a.len(), HASH_LEN);
        assert_ne!(a, ClipCache::compute_hash("a cell dividing", "Mitosis", 8));
        assert_ne!(a, ClipCache::compute_hash("a cell dividing", "Meiosis", 6));
    }

    #[tokio::test]
    async fn test_set_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("clips").join("cache.json");
        let clip = dir.path().join("scene_000.mp4");
        tokio::fs::write(&clip, b"clip").await.unwrap();

        let mut cache = ClipCache::load(&manifest).await;
        assert!(cache.is_empty());
        cache.set(0, "abc", &clip).await;

        let reloaded = ClipCache::load(&manifest).await;
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.is_valid(0, "abc", &clip));
        assert!(!reloaded.is_valid(0, "other", &clip));
        assert!(!reloaded.is_valid(1, "abc", &clip));
    }

    #[tokio::test]
    async fn test_deleted_file_invalidates_entry() {
        let dir = TempDir::new().unwrap();
        let clip = dir.path().join("scene_002.mp4");
        tokio::fs::write(&clip, b"clip").await.unwrap();

        let mut cache = ClipCache::load(dir.path().join("cache.json")).await;
        cache.set(2, "h", &clip).await;
        assert!(cache.is_valid(2, "h", &clip));

        tokio::fs::remove_file(&clip).await.unwrap();
        assert!(!cache.is_valid(2, "h", &clip));
    }

    #[tokio::test]
    async fn test_corrupt_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("cache.json");
        tokio::fs::write(&manifest, b"{not json").await.unwrap();

        assert!(matches!(
            ClipCache::try_load(&manifest).await,
            Err(CacheError::Corrupt { .. })
        ));
        let cache = ClipCache::load(&manifest).await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_missing_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = ClipCache::try_load(&dir.path().join("absent.json")).await.unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("cache.json");
        let mut cache = ClipCache::load(&manifest).await;
        cache.set(0, "a", dir.path().join("x.mp4")).await;
        cache.set(1, "b", dir.path().join("y.mp4")).await;

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cache.json".to_string()]);
    }
}
