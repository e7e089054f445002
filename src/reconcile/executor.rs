// Self-install executor (§4.4): applies planner actions via injected
// filesystem and service-control capabilities, with atomic binary
// replacement. This is the only component in the self-install subsystem
// permitted to perform side effects.

use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::capabilities::{FileInstaller, ServiceController};
use crate::error::AgentError;
use crate::reconcile::types::{Action, InitSystem, Manifest, Step};

pub struct SelfInstallExecutor<'a> {
    file_installer: &'a dyn FileInstaller,
    service_controller: &'a dyn ServiceController,
    self_binary: PathBuf,
}

impl<'a> SelfInstallExecutor<'a> {
    pub fn new(
        file_installer: &'a dyn FileInstaller,
        service_controller: &'a dyn ServiceController,
        self_binary: impl Into<PathBuf>,
    ) -> Self {
        Self {
            file_installer,
            service_controller,
            self_binary: self_binary.into(),
        }
    }

    pub async fn install(
        &self,
        cancel: &CancelToken,
        manifest: &Manifest,
        steps: &[Step],
    ) -> Result<(), AgentError> {
        let mut reload_needed = false;

        for step in steps {
            if cancel.is_cancelled() {
                return Err(AgentError::CancelOrTimeout);
            }

            match step.action {
                Action::CreateDir => {
                    self.file_installer.mkdir_all(&step.path, step.mode).await?;
                }
                Action::CopyBinary => {
                    self.copy_binary_atomically(&step.path, step.mode).await?;
                }
                Action::WriteFile => {
                    let content = step.content.as_deref().unwrap_or("");
                    self.file_installer
                        .write_file(&step.path, content.as_bytes(), step.mode)
                        .await?;
                    if manifest.init_system == InitSystem::Systemd && step.path == manifest.service_file_path {
                        reload_needed = true;
                    }
                }
                Action::EnableService => {
                    self.reload_if_needed(manifest, &mut reload_needed).await?;
                    self.service_controller.enable(&manifest.service_name).await?;
                }
                Action::StartService => {
                    self.reload_if_needed(manifest, &mut reload_needed).await?;
                    self.service_controller.start(&manifest.service_name).await?;
                }
            }
        }

        Ok(())
    }

    async fn reload_if_needed(&self, manifest: &Manifest, reload_needed: &mut bool) -> Result<(), AgentError> {
        if *reload_needed && manifest.init_system == InitSystem::Systemd {
            self.service_controller.daemon_reload().await?;
            *reload_needed = false;
        }
        Ok(())
    }

    async fn copy_binary_atomically(&self, path: &Path, mode: u32) -> Result<(), AgentError> {
        let tmp = append_extension(path, "tmp");
        self.file_installer.copy_file(&self.self_binary, &tmp, mode).await?;
        self.file_installer.rename(&tmp, path).await
    }
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}
