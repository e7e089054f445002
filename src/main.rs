// codedeploy-host-agent/src/main.rs

mod adapters;
mod cancel;
mod capabilities;
mod config;
mod diagnostic;
mod error;
mod executor;
mod layout;
mod poller;
mod reconcile;
mod spec;
mod startup;
#[cfg(test)]
mod testutil;
mod tracker;

use std::collections::HashMap;
use std::sync::Arc;

use adapters::unconfigured::{
    UnconfiguredAppSpecLoader, UnconfiguredCommandService, UnconfiguredDownloader, UnconfiguredHookRunner,
    UnconfiguredInstaller, UnconfiguredUnpacker, UnconfiguredVerifier,
};
use adapters::{LocalFileSystem, SystemServiceController};
use cancel::CancelToken;
use capabilities::{
    AppSpecLoader, CertificateVerifier, CommandService, Downloader, FileInstaller, FileOperator, HookRunner,
    Installer, ServiceController, Unpacker,
};
use config::AgentConfig;
use executor::CommandExecutor;
use poller::Poller;
use reconcile::{executor::SelfInstallExecutor, reconcile};
use tracker::DeploymentTracker;

/// Lifecycle event names dispatched one-for-one to a same-named command,
/// in the fixed order CodeDeploy issues them in (excluding `DownloadBundle`
/// and `Install`, which the executor dispatches to dedicated handlers).
const HOOK_COMMANDS: &[&str] = &[
    "ApplicationStop",
    "BeforeInstall",
    "AfterInstall",
    "ApplicationStart",
    "ValidateService",
];

fn default_hook_mapping() -> HashMap<String, Vec<String>> {
    HOOK_COMMANDS
        .iter()
        .map(|name| (name.to_string(), vec![name.to_string()]))
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let config = AgentConfig::load();

    let file_system = Arc::new(LocalFileSystem);
    let init_system = startup::detect_init_system();
    let service_controller = Arc::new(SystemServiceController::new(init_system));

    run_self_install(&config, file_system.clone(), service_controller.clone(), init_system).await?;

    let tracker = Arc::new(DeploymentTracker::new(
        config.root_dir.clone(),
        file_system.clone() as Arc<dyn FileOperator>,
    ));

    let executor = Arc::new(CommandExecutor::new(
        config.root_dir.clone(),
        config.max_revisions,
        file_system.clone() as Arc<dyn FileOperator>,
        Arc::new(UnconfiguredDownloader) as Arc<dyn Downloader>,
        Arc::new(UnconfiguredUnpacker) as Arc<dyn Unpacker>,
        Arc::new(UnconfiguredAppSpecLoader) as Arc<dyn AppSpecLoader>,
        Arc::new(UnconfiguredInstaller) as Arc<dyn Installer>,
        Arc::new(UnconfiguredHookRunner) as Arc<dyn HookRunner>,
        default_hook_mapping(),
    ));

    let command_service = Arc::new(UnconfiguredCommandService) as Arc<dyn CommandService>;
    let verifier = Some(Arc::new(UnconfiguredVerifier) as Arc<dyn CertificateVerifier>);

    let poller = Poller::new(config, command_service, verifier, tracker, executor);

    if let Err(err) = poller.recover_from_crash().await {
        tracing::error!(error = %err, "crash recovery failed, continuing to poll regardless");
    }

    let cancel = CancelToken::new();
    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received shutdown signal");
        shutdown_cancel.cancel();
    });

    poller.run(cancel).await;

    Ok(())
}

async fn run_self_install(
    config: &AgentConfig,
    file_system: Arc<LocalFileSystem>,
    service_controller: Arc<SystemServiceController>,
    init_system: reconcile::InitSystem,
) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = startup::build_manifest(config, init_system);
    let state = startup::observe_state(&manifest).await;
    let steps = reconcile(&manifest, &state);

    if steps.is_empty() {
        tracing::info!("self-install already converged, nothing to do");
        return Ok(());
    }

    let current_exe = std::env::current_exe()?;
    let install_executor = SelfInstallExecutor::new(
        file_system.as_ref() as &dyn FileInstaller,
        service_controller.as_ref() as &dyn ServiceController,
        current_exe,
    );
    let cancel = CancelToken::new();
    install_executor.install(&cancel, &manifest, &steps).await?;
    tracing::info!(step_count = steps.len(), "self-install reconciliation applied");
    Ok(())
}
