//! Project persistence seam.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use studyreel_models::{Project, ProjectId};

use crate::error::{StoreError, StoreResult};

/// Persistence for projects and their scene rows.
///
/// Every write goes through [`ProjectStore::commit`], which only succeeds when
/// the snapshot's `revision` still matches the stored one. A stage reads a
/// snapshot, does its work in memory, then commits once; a concurrent stage
/// that committed first makes the late commit fail with
/// [`StoreError::Conflict`] instead of interleaving scene rows.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Store a new project. Fails if the id is taken.
    async fn create(&self, project: Project) -> StoreResult<Project>;

    /// Latest snapshot of a project.
    async fn get(&self, id: &ProjectId) -> StoreResult<Project>;

    /// Replace the stored project if its revision is unchanged. Returns the
    /// stored value with the bumped revision.
    async fn commit(&self, project: Project) -> StoreResult<Project>;

    /// Remove a project record.
    async fn delete(&self, id: &ProjectId) -> StoreResult<()>;
}

/// Check the optimistic revision and bump it.
pub(crate) fn advance_revision(stored: &Project, mut next: Project) -> StoreResult<Project> {
    if stored.revision != next.revision {
        return Err(StoreError::Conflict {
            expected: next.revision,
            found: stored.revision,
        });
    }
    next.revision += 1;
    Ok(next)
}

/// Process-local store, lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    projects: RwLock<HashMap<ProjectId, Project>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.projects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.projects.read().await.is_empty()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn create(&self, project: Project) -> StoreResult<Project> {
        let mut projects = self.projects.write().await;
        if projects.contains_key(&project.id) {
            return Err(StoreError::AlreadyExists(project.id.to_string()));
        }
        debug!(project_id = %project.id, "Creating project");
        projects.insert(project.id.clone(), project.clone());
        Ok(project)
    }

    async fn get(&self, id: &ProjectId) -> StoreResult<Project> {
        self.projects
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id.as_str()))
    }

    async fn commit(&self, project: Project) -> StoreResult<Project> {
        let mut projects = self.projects.write().await;
        let stored = projects
            .get(&project.id)
            .ok_or_else(|| StoreError::not_found(project.id.as_str()))?;
        let next = advance_revision(stored, project)?;
        debug!(project_id = %next.id, revision = next.revision, "Committed project");
        projects.insert(next.id.clone(), next.clone());
        Ok(next)
    }

    async fn delete(&self, id: &ProjectId) -> StoreResult<()> {
        self.projects
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyreel_models::{Outline, OutlineSection, ProjectStatus};

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryProjectStore::new();
        let project = store.create(Project::new("Cells", "text")).await.unwrap();

        let loaded = store.get(&project.id).await.unwrap();
        assert_eq!(loaded.title, "Cells");
        assert_eq!(loaded.revision, 0);

        let err = store.create(project.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = InMemoryProjectStore::new();
        let err = store.get(&ProjectId::from_string("nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_commit_bumps_revision() {
        let store = InMemoryProjectStore::new();
        let mut project = store.create(Project::new("Cells", "text")).await.unwrap();

        project.outline = Some(Outline {
            sections: vec![OutlineSection::new("Intro", vec!["point"])],
        });
        project.status = ProjectStatus::OutlineReady;
        let committed = store.commit(project).await.unwrap();
        assert_eq!(committed.revision, 1);

        let loaded = store.get(&committed.id).await.unwrap();
        assert_eq!(loaded.status, ProjectStatus::OutlineReady);
        assert_eq!(loaded.revision, 1);
    }

    #[tokio::test]
    async fn test_stale_commit_conflicts() {
        let store = InMemoryProjectStore::new();
        let project = store.create(Project::new("Cells", "text")).await.unwrap();
        let id = project.id.clone();

        let first = project.clone();
        let mut second = project;
        second.title = "Late writer".into();

        store.commit(first).await.unwrap();
        let err = store.commit(second).await.unwrap_err();
        assert!(err.is_conflict());
        match err {
            StoreError::Conflict { expected, found } => {
                assert_eq!(expected, 0);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let loaded = store.get(&id).await.unwrap();
        assert_eq!(loaded.title, "Cells");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryProjectStore::new();
        let project = store.create(Project::new("Cells", "text")).await.unwrap();
        store.delete(&project.id).await.unwrap();
        assert!(store.is_empty().await);
        assert!(store.delete(&project.id).await.is_err());
    }
}
