// Command executor (§4.6): dispatches a command by name against the
// DownloadBundle / Install / lifecycle-hook-group pipeline, owning
// per-deployment directory bookkeeping, retention, and log files.

mod download;
mod hooks;
mod install;

use std::collections::HashMap;
use std::sync::Arc;

use crate::capabilities::{AppSpecLoader, Downloader, FileOperator, HookRunner, Installer, Unpacker};
use crate::error::AgentError;
use crate::layout::Layout;
use crate::spec::model::Spec;

pub const DOWNLOAD_BUNDLE: &str = "DownloadBundle";
pub const INSTALL: &str = "Install";

pub struct CommandExecutor {
    root_dir: String,
    max_revisions: usize,
    file_op: Arc<dyn FileOperator>,
    downloader: Arc<dyn Downloader>,
    unpacker: Arc<dyn Unpacker>,
    appspec_loader: Arc<dyn AppSpecLoader>,
    installer: Arc<dyn Installer>,
    hook_runner: Arc<dyn HookRunner>,
    hook_mapping: HashMap<String, Vec<String>>,
}

impl CommandExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        root_dir: impl Into<String>,
        max_revisions: usize,
        file_op: Arc<dyn FileOperator>,
        downloader: Arc<dyn Downloader>,
        unpacker: Arc<dyn Unpacker>,
        appspec_loader: Arc<dyn AppSpecLoader>,
        installer: Arc<dyn Installer>,
        hook_runner: Arc<dyn HookRunner>,
        hook_mapping: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            root_dir: root_dir.into(),
            max_revisions: if max_revisions < 1 { 5 } else { max_revisions },
            file_op,
            downloader,
            unpacker,
            appspec_loader,
            installer,
            hook_runner,
            hook_mapping,
        }
    }

    fn layout(&self, spec: &Spec) -> Layout {
        Layout::new(self.root_dir.clone(), spec.deployment_group_id.clone(), spec.deployment_id.clone())
    }

    pub async fn execute(&self, command_name: &str, spec: &Spec) -> Result<String, AgentError> {
        let layout = self.layout(spec);
        self.file_op.create_dir_all(&layout.deployment_root_dir()).await?;

        match command_name {
            DOWNLOAD_BUNDLE => {
                download::download_bundle(
                    &layout,
                    spec,
                    self.max_revisions,
                    self.file_op.as_ref(),
                    self.downloader.as_ref(),
                    self.unpacker.as_ref(),
                )
                .await
            }
            INSTALL => {
                install::install(
                    &layout,
                    spec,
                    self.file_op.as_ref(),
                    self.appspec_loader.as_ref(),
                    self.installer.as_ref(),
                )
                .await
            }
            other => {
                let events = self.hook_mapping.get(other).cloned().unwrap_or_default();
                hooks::run_hook_group(&layout, spec, &events, self.file_op.as_ref(), self.hook_runner.as_ref()).await
            }
        }
    }

    pub async fn is_noop(&self, command_name: &str, spec: &Spec) -> bool {
        if command_name == DOWNLOAD_BUNDLE || command_name == INSTALL {
            return false;
        }
        let events = match self.hook_mapping.get(command_name) {
            None => return true,
            Some(events) => events,
        };
        let layout = self.layout(spec);
        for event in events {
            let args = hooks::build_hook_args(&layout, spec, event, None, None);
            if !self.hook_runner.is_noop(&args).await {
                return false;
            }
        }
        true
    }
}
