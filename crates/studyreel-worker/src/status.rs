//! In-process stage status tracking.

use std::collections::HashMap;
use std::sync::RwLock;

use studyreel_models::{ProjectId, Stage, StageStatus};

/// Progress snapshots per project and stage.
///
/// Snapshots are replaced wholesale on every transition. A project that never
/// ran a stage reads as pending.
pub trait StatusTracker: Send + Sync {
    fn set(&self, stage: Stage, project_id: &ProjectId, status: StageStatus);

    fn get(&self, stage: Stage, project_id: &ProjectId) -> StageStatus;

    /// Drop every snapshot for a project.
    fn clear(&self, project_id: &ProjectId);

    fn asset_status(&self, project_id: &ProjectId) -> StageStatus {
        self.get(Stage::Assets, project_id)
    }

    fn video_status(&self, project_id: &ProjectId) -> StageStatus {
        self.get(Stage::Video, project_id)
    }
}

/// Tracker held in process memory; lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryStatusTracker {
    assets: RwLock<HashMap<ProjectId, StageStatus>>,
    video: RwLock<HashMap<ProjectId, StageStatus>>,
}

impl InMemoryStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, stage: Stage) -> &RwLock<HashMap<ProjectId, StageStatus>> {
        match stage {
            Stage::Assets => &self.assets,
            Stage::Video => &self.video,
        }
    }
}

impl StatusTracker for InMemoryStatusTracker {
    fn set(&self, stage: Stage, project_id: &ProjectId, status: StageStatus) {
        let mut map = self.map(stage).write().unwrap_or_else(|e| e.into_inner());
        map.insert(project_id.clone(), status);
    }

    fn get(&self, stage: Stage, project_id: &ProjectId) -> StageStatus {
        let map = self.map(stage).read().unwrap_or_else(|e| e.into_inner());
        map.get(project_id).cloned().unwrap_or_else(StageStatus::pending)
    }

    fn clear(&self, project_id: &ProjectId) {
        for stage in [Stage::Assets, Stage::Video] {
            let mut map = self.map(stage).write().unwrap_or_else(|e| e.into_inner());
            map.remove(project_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyreel_models::StageState;

    #[test]
    fn test_absent_entry_is_pending() {
        let tracker = InMemoryStatusTracker::new();
        let status = tracker.asset_status(&ProjectId::from_string("p"));
        assert_eq!(status.status, StageState::Pending);
        assert_eq!(status.progress, 0.0);
    }

    #[test]
    fn test_set_overwrites_and_stages_are_independent() {
        let tracker = InMemoryStatusTracker::new();
        let id = ProjectId::from_string("p");

        tracker.set(Stage::Assets, &id, StageStatus::in_progress(0.5, "Generated audio 1/1"));
        tracker.set(Stage::Assets, &id, StageStatus::completed("All assets generated"));

        let assets = tracker.asset_status(&id);
        assert_eq!(assets.status, StageState::Completed);
        assert_eq!(assets.progress, 1.0);
        assert_eq!(tracker.video_status(&id).status, StageState::Pending);
    }

    #[test]
    fn test_clear_resets_both_stages() {
        let tracker = InMemoryStatusTracker::new();
        let id = ProjectId::from_string("p");
        tracker.set(Stage::Assets, &id, StageStatus::failed(0.25, "boom"));
        tracker.set(Stage::Video, &id, StageStatus::completed("Video ready"));

        tracker.clear(&id);
        assert_eq!(tracker.asset_status(&id).status, StageState::Pending);
        assert_eq!(tracker.video_status(&id).status, StageState::Pending);
    }
}
