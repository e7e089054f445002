// Deployment-layout module (§4.5): pure path derivation, no I/O. Every
// path the command executor and tracker touch is computed here so the
// directory scheme lives in exactly one place.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root_dir: PathBuf,
    pub deployment_group_id: String,
    pub deployment_id: String,
}

impl Layout {
    pub fn new(root_dir: impl Into<PathBuf>, deployment_group_id: impl Into<String>, deployment_id: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            deployment_group_id: deployment_group_id.into(),
            deployment_id: deployment_id.into(),
        }
    }

    fn group_dir(&self) -> PathBuf {
        self.root_dir.join(&self.deployment_group_id)
    }

    pub fn deployment_root_dir(&self) -> PathBuf {
        self.group_dir().join(&self.deployment_id)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.deployment_root_dir().join("archive")
    }

    pub fn bundle_file(&self, bundle_type: &str) -> PathBuf {
        let ext = if bundle_type == "directory" { "dir" } else { bundle_type };
        self.deployment_root_dir().join(format!("bundle.{ext}"))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.deployment_root_dir().join("logs")
    }

    pub fn script_log_file(&self) -> PathBuf {
        self.deployment_root_dir().join("scripts.log")
    }

    pub fn instructions_dir(&self) -> PathBuf {
        self.deployment_root_dir().join("instructions")
    }

    pub fn shared_deployment_logs_dir(&self) -> PathBuf {
        self.root_dir.join("deployment-logs")
    }

    pub fn shared_deployment_log_file(&self) -> PathBuf {
        self.shared_deployment_logs_dir().join("codedeploy-agent-deployments.log")
    }

    pub fn most_recent_pointer(&self) -> PathBuf {
        self.group_dir().join("most_recent")
    }

    pub fn last_successful_pointer(&self) -> PathBuf {
        self.group_dir().join("last_successful")
    }

    /// Every sibling deployment root under this deployment's group, derived
    /// purely from the root path — used by retention cleanup to compute
    /// candidates (actual listing is done through `FileOperator`).
    pub fn group_dir_for_listing(&self) -> PathBuf {
        self.group_dir()
    }
}

pub fn tracker_dir(root_dir: &Path) -> PathBuf {
    root_dir.join(".tracker")
}

pub fn tracker_marker_file(root_dir: &Path, deployment_id: &str) -> PathBuf {
    tracker_dir(root_dir).join(deployment_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_expected_paths() {
        let layout = Layout::new("/var/agent-root", "dg-1", "d-1");
        assert_eq!(layout.deployment_root_dir(), PathBuf::from("/var/agent-root/dg-1/d-1"));
        assert_eq!(layout.archive_dir(), PathBuf::from("/var/agent-root/dg-1/d-1/archive"));
        assert_eq!(layout.bundle_file("tar"), PathBuf::from("/var/agent-root/dg-1/d-1/bundle.tar"));
        assert_eq!(layout.logs_dir(), PathBuf::from("/var/agent-root/dg-1/d-1/logs"));
        assert_eq!(layout.script_log_file(), PathBuf::from("/var/agent-root/dg-1/d-1/scripts.log"));
        assert_eq!(layout.most_recent_pointer(), PathBuf::from("/var/agent-root/dg-1/most_recent"));
        assert_eq!(layout.last_successful_pointer(), PathBuf::from("/var/agent-root/dg-1/last_successful"));
    }

    #[test]
    fn directory_bundle_type_uses_dir_extension() {
        let layout = Layout::new("/root", "dg", "d");
        assert_eq!(layout.bundle_file("directory"), PathBuf::from("/root/dg/d/bundle.dir"));
    }
}
