// Subprocess-based `ServiceController` (§6) driving `systemctl` and
// `service` (SysV). The agent itself decides which to use via
// `reconcile::types::InitSystem`; this adapter only shells out.

use async_trait::async_trait;
use tokio::process::Command;

use crate::capabilities::ServiceController;
use crate::error::AgentError;
use crate::reconcile::types::InitSystem;

pub struct SystemServiceController {
    init_system: InitSystem,
}

impl SystemServiceController {
    pub fn new(init_system: InitSystem) -> Self {
        Self { init_system }
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<(), AgentError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| AgentError::IoError(format!("failed to spawn {program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::IoError(format!("{program} {args:?} failed: {stderr}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceController for SystemServiceController {
    async fn enable(&self, service_name: &str) -> Result<(), AgentError> {
        match self.init_system {
            InitSystem::Systemd => self.run("systemctl", &["enable", service_name]).await,
            InitSystem::SysV => self.run("chkconfig", &[service_name, "on"]).await,
        }
    }

    async fn start(&self, service_name: &str) -> Result<(), AgentError> {
        match self.init_system {
            InitSystem::Systemd => self.run("systemctl", &["start", service_name]).await,
            InitSystem::SysV => self.run("service", &[service_name, "start"]).await,
        }
    }

    async fn daemon_reload(&self) -> Result<(), AgentError> {
        match self.init_system {
            InitSystem::Systemd => self.run("systemctl", &["daemon-reload"]).await,
            InitSystem::SysV => Ok(()),
        }
    }
}
