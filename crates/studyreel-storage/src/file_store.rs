//! JSON-file project store.
//!
//! Each project lives in `<base>/<project_id>/project.json`, next to its
//! media. Writes go to a sibling temp file and are renamed into place.

use std::io;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use studyreel_models::{Project, ProjectId};

use crate::error::{StoreError, StoreResult};
use crate::layout::LocalStorage;
use crate::repo::{advance_revision, ProjectStore};

/// [`ProjectStore`] persisting one JSON document per project.
pub struct FileProjectStore {
    storage: LocalStorage,
    /// Serialises read-check-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileProjectStore {
    pub fn new(storage: LocalStorage) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    async fn read(&self, id: &ProjectId) -> StoreResult<Project> {
        let path = self.storage.project_record_path(id);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::not_found(id.as_str()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write(&self, project: &Project) -> StoreResult<()> {
        let path = self.storage.project_record_path(&project.id);
        fs::create_dir_all(self.storage.project_dir(&project.id)).await?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(project)?).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for FileProjectStore {
    async fn create(&self, project: Project) -> StoreResult<Project> {
        let _guard = self.write_lock.lock().await;
        if fs::try_exists(self.storage.project_record_path(&project.id)).await? {
            return Err(StoreError::AlreadyExists(project.id.to_string()));
        }
        self.write(&project).await?;
        debug!(project_id = %project.id, "Created project record");
        Ok(project)
    }

    async fn get(&self, id: &ProjectId) -> StoreResult<Project> {
        self.read(id).await
    }

    async fn commit(&self, project: Project) -> StoreResult<Project> {
        let _guard = self.write_lock.lock().await;
        let stored = self.read(&project.id).await?;
        let next = advance_revision(&stored, project)?;
        self.write(&next).await?;
        debug!(project_id = %next.id, revision = next.revision, "Committed project record");
        Ok(next)
    }

    async fn delete(&self, id: &ProjectId) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(self.storage.project_record_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::not_found(id.as_str())),
            Err(e) => Err(e.into()),
        }
    }
}
