// Deployment tracker (§4.5): persists "in-progress" markers for crash
// recovery and enforces at-most-one tracked in-flight command.

use std::path::PathBuf;
use std::sync::Arc;

use crate::capabilities::FileOperator;
use crate::error::AgentError;
use crate::layout::{tracker_dir, tracker_marker_file};

pub struct DeploymentTracker {
    root_dir: PathBuf,
    file_op: Arc<dyn FileOperator>,
}

impl DeploymentTracker {
    pub fn new(root_dir: impl Into<PathBuf>, file_op: Arc<dyn FileOperator>) -> Self {
        Self {
            root_dir: root_dir.into(),
            file_op,
        }
    }

    pub async fn create(&self, deployment_id: &str, host_command_identifier: &str) -> Result<(), AgentError> {
        self.file_op.create_dir_all(&tracker_dir(&self.root_dir)).await?;
        let marker = tracker_marker_file(&self.root_dir, deployment_id);
        self.file_op
            .write_file(&marker, host_command_identifier.as_bytes())
            .await
    }

    pub async fn delete(&self, deployment_id: &str) -> Result<(), AgentError> {
        let marker = tracker_marker_file(&self.root_dir, deployment_id);
        if self.file_op.exists(&marker).await {
            self.file_op.remove_file(&marker).await?;
        }
        Ok(())
    }

    /// Returns the in-progress host command identifier, or `""` if there is
    /// none. If more than one marker is observed — a state that should not
    /// arise in steady state but can follow certain crash interleavings —
    /// the lexicographically first `deployment_id` wins deterministically,
    /// and a warning is logged rather than panicking.
    pub async fn in_progress_command(&self) -> Result<String, AgentError> {
        let dir = tracker_dir(&self.root_dir);
        if !self.file_op.exists(&dir).await {
            return Ok(String::new());
        }
        let mut entries = self.file_op.list_dir_with_mod_time(&dir).await?;
        if entries.is_empty() {
            return Ok(String::new());
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        if entries.len() > 1 {
            tracing::warn!(
                count = entries.len(),
                "multiple in-progress tracker markers found, expected at most one"
            );
        }
        let (marker_path, _) = &entries[0];
        let contents = self.file_op.read_to_string(marker_path).await?;
        Ok(contents.trim().to_string())
    }

    pub async fn clean_all(&self) -> Result<(), AgentError> {
        let dir = tracker_dir(&self.root_dir);
        if self.file_op.exists(&dir).await {
            self.file_op.remove_dir_all(&dir).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeFileOperator;

    fn tracker() -> (DeploymentTracker, Arc<FakeFileOperator>) {
        let fake = Arc::new(FakeFileOperator::new());
        let tracker = DeploymentTracker::new("/root", fake.clone() as Arc<dyn FileOperator>);
        (tracker, fake)
    }

    #[tokio::test]
    async fn no_marker_means_empty_in_progress() {
        let (tracker, _fake) = tracker();
        assert_eq!(tracker.in_progress_command().await.unwrap(), "");
    }

    #[tokio::test]
    async fn create_then_in_progress_round_trips() {
        let (tracker, _fake) = tracker();
        tracker.create("d-1", "hc-1").await.unwrap();
        assert_eq!(tracker.in_progress_command().await.unwrap(), "hc-1");
    }

    #[tokio::test]
    async fn delete_clears_in_progress() {
        let (tracker, _fake) = tracker();
        tracker.create("d-1", "hc-1").await.unwrap();
        tracker.delete("d-1").await.unwrap();
        assert_eq!(tracker.in_progress_command().await.unwrap(), "");
    }

    #[tokio::test]
    async fn clean_all_removes_everything() {
        let (tracker, _fake) = tracker();
        tracker.create("d-1", "hc-1").await.unwrap();
        tracker.create("d-2", "hc-2").await.unwrap();
        tracker.clean_all().await.unwrap();
        assert_eq!(tracker.in_progress_command().await.unwrap(), "");
    }

    #[tokio::test]
    async fn at_most_one_in_flight_after_recovery_semantics() {
        let (tracker, _fake) = tracker();
        tracker.create("d-1", "hc-crashed").await.unwrap();
        let in_progress = tracker.in_progress_command().await.unwrap();
        assert_eq!(in_progress, "hc-crashed");
        tracker.clean_all().await.unwrap();
        assert_eq!(tracker.in_progress_command().await.unwrap(), "");
    }
}
