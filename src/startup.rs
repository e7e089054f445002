// Startup wiring for the self-install subsystem (§4.3, §6): builds the
// declared `Manifest` and observes current host `State` so `main` can run
// `reconcile` once before the poller starts. This is plain imperative
// code, not behind a capability trait — observation (is the service
// enabled/running, does the installed binary match) is inherently a
// one-shot startup probe, not something the core's tested components need
// to mock.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::config::AgentConfig;
use crate::reconcile::types::{InitSystem, Manifest, State};

const SERVICE_NAME: &str = "codedeploy-agent";
const INSTALL_DIR: &str = "/opt/codedeploy-agent";
const CONFIG_PATH: &str = "/etc/codedeploy-agent/conf/codedeployagent.yml";

pub fn detect_init_system() -> InitSystem {
    if Path::new("/run/systemd/system").exists() {
        InitSystem::Systemd
    } else {
        InitSystem::SysV
    }
}

pub fn build_manifest(config: &AgentConfig, init_system: InitSystem) -> Manifest {
    let binary_path = PathBuf::from(INSTALL_DIR).join("bin").join(SERVICE_NAME);
    let config_path = PathBuf::from(CONFIG_PATH);
    let service_file_path = match init_system {
        InitSystem::Systemd => PathBuf::from(format!("/etc/systemd/system/{SERVICE_NAME}.service")),
        InitSystem::SysV => PathBuf::from(format!("/etc/init.d/{SERVICE_NAME}")),
    };

    let dirs = vec![
        PathBuf::from(INSTALL_DIR),
        PathBuf::from(INSTALL_DIR).join("bin"),
        config_path.parent().unwrap_or(Path::new("/etc/codedeploy-agent")).to_path_buf(),
        PathBuf::from(&config.root_dir),
    ];

    Manifest {
        init_system,
        binary_path: binary_path.clone(),
        service_file_path,
        service_file_content: service_file_content(init_system, &binary_path),
        config_path,
        config_content: config_content(config),
        service_name: SERVICE_NAME.to_string(),
        dirs,
    }
}

fn service_file_content(init_system: InitSystem, binary_path: &Path) -> String {
    match init_system {
        InitSystem::Systemd => format!(
            "[Unit]\nDescription=AWS CodeDeploy Host Agent\nAfter=network.target\n\n\
             [Service]\nType=simple\nExecStart={}\nRestart=always\nRestartSec=5\n\n\
             [Install]\nWantedBy=multi-user.target\n",
            binary_path.display()
        ),
        InitSystem::SysV => format!(
            "#!/bin/sh\n# chkconfig: 2345 95 05\n# description: AWS CodeDeploy Host Agent\n\
             case \"$1\" in\n  start) exec {} ;;\n  *) echo \"usage: $0 start\" ;;\nesac\n",
            binary_path.display()
        ),
    }
}

fn config_content(config: &AgentConfig) -> String {
    format!(
        ":log_dir: '/var/log/aws/codedeploy-agent'\n:root_dir: '{}'\n:max_revisions: {}\n",
        config.root_dir, config.max_revisions
    )
}

pub async fn observe_state(manifest: &Manifest) -> State {
    let mut state = State::default();

    for dir in &manifest.dirs {
        state.dirs_exist.insert(dir.clone(), tokio::fs::metadata(dir).await.is_ok());
    }

    state.binary_exists = tokio::fs::metadata(&manifest.binary_path).await.is_ok();
    state.binary_matches_hash = state.binary_exists && binary_matches_current_exe(&manifest.binary_path).await;
    state.config_exists = tokio::fs::metadata(&manifest.config_path).await.is_ok();
    state.service_enabled = service_query(manifest.init_system, "is-enabled", &manifest.service_name).await;
    state.service_running = service_query(manifest.init_system, "is-active", &manifest.service_name).await;

    state
}

async fn binary_matches_current_exe(installed_path: &Path) -> bool {
    let current_exe = match std::env::current_exe() {
        Ok(path) => path,
        Err(_) => return false,
    };
    let (installed, current) = tokio::join!(tokio::fs::read(installed_path), tokio::fs::read(&current_exe));
    match (installed, current) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

async fn service_query(init_system: InitSystem, systemd_subcommand: &str, service_name: &str) -> bool {
    let result = match init_system {
        InitSystem::Systemd => Command::new("systemctl").args([systemd_subcommand, service_name]).output().await,
        InitSystem::SysV => Command::new("service").args([service_name, "status"]).output().await,
    };
    matches!(result, Ok(output) if output.status.success())
}
