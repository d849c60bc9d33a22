//! Local filesystem layout.
//!
//! ```text
//! <base>/<project_id>/
//!     project.json
//!     images/scene_000.png
//!     audio/scene_000.wav
//!     clips/scene_000.mp4
//!     clips/cache.json
//!     video/output.mp4
//!     staging/<run_id>/
//! ```

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use studyreel_models::ProjectId;

/// Per-project directory layout rooted at `base_dir`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn project_dir(&self, id: &ProjectId) -> PathBuf {
        self.base_dir.join(id.as_str())
    }

    pub fn project_record_path(&self, id: &ProjectId) -> PathBuf {
        self.project_dir(id).join("project.json")
    }

    pub fn images_dir(&self, id: &ProjectId) -> PathBuf {
        self.project_dir(id).join("images")
    }

    pub fn audio_dir(&self, id: &ProjectId) -> PathBuf {
        self.project_dir(id).join("audio")
    }

    pub fn clips_dir(&self, id: &ProjectId) -> PathBuf {
        self.project_dir(id).join("clips")
    }

    pub fn video_dir(&self, id: &ProjectId) -> PathBuf {
        self.project_dir(id).join("video")
    }

    pub fn scene_image_path(&self, id: &ProjectId, index: usize) -> PathBuf {
        self.images_dir(id).join(scene_file(index, "png"))
    }

    pub fn scene_audio_path(&self, id: &ProjectId, index: usize) -> PathBuf {
        self.audio_dir(id).join(scene_file(index, "wav"))
    }

    pub fn scene_clip_path(&self, id: &ProjectId, index: usize) -> PathBuf {
        self.clips_dir(id).join(scene_file(index, "mp4"))
    }

    /// Clip cache manifest.
    pub fn clip_cache_path(&self, id: &ProjectId) -> PathBuf {
        self.clips_dir(id).join("cache.json")
    }

    pub fn video_output_path(&self, id: &ProjectId) -> PathBuf {
        self.video_dir(id).join("output.mp4")
    }

    /// Scratch directory for one asset run; promoted into place on commit.
    pub fn staging_dir(&self, id: &ProjectId, run_id: &str) -> PathBuf {
        self.project_dir(id).join("staging").join(run_id)
    }

    /// Create every per-project directory.
    pub async fn ensure_project_dirs(&self, id: &ProjectId) -> io::Result<()> {
        for dir in [
            self.images_dir(id),
            self.audio_dir(id),
            self.clips_dir(id),
            self.video_dir(id),
        ] {
            fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    /// Path relative to the storage root, with forward slashes.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_dir).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Remove everything stored for a project. Missing directories are fine.
    pub async fn delete_project_files(&self, id: &ProjectId) -> io::Result<()> {
        let dir = self.project_dir(id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!("Deleted project files: {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn scene_file(index: usize, ext: &str) -> String {
    format!("scene_{:03}.{}", index, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let storage = LocalStorage::new("/data");
        let id = ProjectId::from_string("p1");

        assert_eq!(
            storage.scene_image_path(&id, 3),
            PathBuf::from("/data/p1/images/scene_003.png")
        );
        assert_eq!(
            storage.scene_audio_path(&id, 12),
            PathBuf::from("/data/p1/audio/scene_012.wav")
        );
        assert_eq!(
            storage.scene_clip_path(&id, 0),
            PathBuf::from("/data/p1/clips/scene_000.mp4")
        );
        assert_eq!(storage.clip_cache_path(&id), PathBuf::from("/data/p1/clips/cache.json"));
        assert_eq!(
            storage.video_output_path(&id),
            PathBuf::from("/data/p1/video/output.mp4")
        );
        assert_eq!(
            storage.staging_dir(&id, "run1"),
            PathBuf::from("/data/p1/staging/run1")
        );
    }

    #[test]
    fn test_relative_path() {
        let storage = LocalStorage::new("/data");
        let id = ProjectId::from_string("p1");
        assert_eq!(
            storage.relative_path(&storage.video_output_path(&id)).as_deref(),
            Some("p1/video/output.mp4")
        );
        assert!(storage.relative_path(Path::new("/elsewhere/x.mp4")).is_none());
    }

    #[tokio::test]
    async fn test_ensure_and_delete_project_dirs() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let id = ProjectId::from_string("p1");

        storage.ensure_project_dirs(&id).await.unwrap();
        assert!(storage.clips_dir(&id).is_dir());
        assert!(storage.video_dir(&id).is_dir());

        storage.delete_project_files(&id).await.unwrap();
        assert!(!storage.project_dir(&id).exists());

        // Deleting again is a no-op
        storage.delete_project_files(&id).await.unwrap();
    }
}
