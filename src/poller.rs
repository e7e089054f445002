// Poller (§4.7, §5): the long-lived control loop. Polls for commands,
// acknowledges, executes, and completes them with bounded concurrency
// and adaptive backoff. Owns `consecutiveErrors`; no other task touches it.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Semaphore;

use crate::cancel::CancelToken;
use crate::capabilities::{CertificateVerifier, CommandService};
use crate::config::AgentConfig;
use crate::diagnostic::Diagnostic;
use crate::error::AgentError;
use crate::executor::CommandExecutor;
use crate::spec::envelope::Envelope;
use crate::spec::model::HostCommand;
use crate::spec::parser;
use crate::tracker::DeploymentTracker;

const BACKOFF_EXPONENT_CAP: u32 = 6;

/// Ensures `tracker.delete` runs even if `execute` panics (§4.7(e), §5: the
/// delete is "deferred ... regardless of outcome", and `process_command` runs
/// under a panic-catching `tokio::spawn`, so a panic inside `execute` is an
/// anticipated unwind path). The normal path calls `tracker.delete` directly
/// and disarms the guard; `disarm` is a no-op if that never happens because
/// the stack unwound first, in which case `Drop` schedules the same delete.
struct TrackerDeleteGuard {
    tracker: Arc<DeploymentTracker>,
    deployment_id: String,
    hci: String,
    armed: bool,
}

impl TrackerDeleteGuard {
    fn new(tracker: Arc<DeploymentTracker>, deployment_id: String, hci: String) -> Self {
        Self {
            tracker,
            deployment_id,
            hci,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TrackerDeleteGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let tracker = self.tracker.clone();
        let deployment_id = std::mem::take(&mut self.deployment_id);
        let hci = std::mem::take(&mut self.hci);
        tokio::spawn(async move {
            match tracker.delete(&deployment_id).await {
                Ok(()) => tracing::warn!(hci = %hci, "deleted tracker entry after command task unwound"),
                Err(err) => tracing::error!(hci = %hci, error = %err, "failed to delete tracker entry during unwind"),
            }
        });
    }
}

pub struct Poller {
    config: AgentConfig,
    command_service: Arc<dyn CommandService>,
    verifier: Option<Arc<dyn CertificateVerifier>>,
    tracker: Arc<DeploymentTracker>,
    executor: Arc<CommandExecutor>,
}

impl Poller {
    pub fn new(
        config: AgentConfig,
        command_service: Arc<dyn CommandService>,
        verifier: Option<Arc<dyn CertificateVerifier>>,
        tracker: Arc<DeploymentTracker>,
        executor: Arc<CommandExecutor>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            command_service,
            verifier,
            tracker,
            executor,
        })
    }

    /// Called once before `run`. Fails any command left in-progress by a
    /// prior crash, then clears the tracker so steady-state polling starts
    /// from a clean slate.
    pub async fn recover_from_crash(&self) -> Result<(), AgentError> {
        let hci = self.tracker.in_progress_command().await?;
        if hci.is_empty() {
            return Ok(());
        }
        tracing::warn!(hci = %hci, "recovering in-progress command after restart");
        let envelope = Envelope::json(Diagnostic::build_failed_after_restart(
            "Failing in-progress lifecycle event after an agent restart.",
        ));
        self.command_service.complete(&hci, "Failed", envelope).await?;
        self.tracker.clean_all().await?;
        Ok(())
    }

    pub async fn run(self: &Arc<Self>, cancel: CancelToken) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut consecutive_errors: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.command_service.poll_host_command(&self.config.host_identifier).await {
                Err(err) => {
                    consecutive_errors += 1;
                    let delay = self.compute_backoff(&err, consecutive_errors);
                    tracing::warn!(error = %err, delay_ms = delay.as_millis() as u64, "poll failed, backing off");
                    if wait_or_cancel(delay, &cancel).await {
                        break;
                    }
                }
                Ok(None) => {
                    consecutive_errors = 0;
                    if wait_or_cancel(self.config.poll_interval, &cancel).await {
                        break;
                    }
                }
                Ok(Some(command)) => {
                    consecutive_errors = 0;
                    if command.command_name.is_empty() {
                        continue;
                    }
                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };
                    let poller = self.clone();
                    let task_cancel = cancel.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        let result = tokio::spawn({
                            let poller = poller.clone();
                            async move { poller.process_command(command, task_cancel).await }
                        })
                        .await;
                        if let Err(join_err) = result {
                            tracing::error!(error = %join_err, "command processing task panicked");
                        }
                    });
                }
            }
        }

        self.shutdown(semaphore).await;
    }

    async fn shutdown(&self, semaphore: Arc<Semaphore>) {
        tracing::info!("shutting down, waiting for in-flight commands");
        let total = self.config.max_concurrent as u32;
        match tokio::time::timeout(self.config.shutdown_wait, semaphore.acquire_many_owned(total)).await {
            Ok(Ok(_permits)) => tracing::info!("all in-flight commands finished before shutdown"),
            Ok(Err(_)) => tracing::warn!("semaphore closed during shutdown wait"),
            Err(_) => tracing::warn!("shutdown wait timed out with commands still in flight"),
        }
    }

    async fn process_command(&self, command: HostCommand, _cancel: CancelToken) {
        let hci = command.host_command_identifier.clone();

        let (envelope, deploy_system) = match self
            .command_service
            .get_deployment_specification(&command.deployment_execution_id, &command.host_identifier)
            .await
        {
            Ok(pair) => pair,
            Err(err) => {
                self.complete_failed(&hci, &err).await;
                return;
            }
        };
        if deploy_system != "CodeDeploy" {
            self.complete_failed(&hci, &AgentError::SystemMismatch(Some(deploy_system))).await;
            return;
        }

        let spec = match parser::parse(&envelope, self.verifier.as_deref(), self.config.allow_unsigned).await {
            Ok(spec) => spec,
            Err(err) => {
                self.complete_failed(&hci, &err).await;
                return;
            }
        };

        let is_noop = self.executor.is_noop(&command.command_name, &spec).await;
        let ack_envelope = Envelope::json(format!(r#"{{"IsCommandNoop":{}}}"#, is_noop));
        let ack_status = match self.command_service.acknowledge(&hci, ack_envelope).await {
            Ok(status) => status,
            Err(err) => {
                tracing::error!(hci = %hci, error = %err, "failed to acknowledge command");
                return;
            }
        };
        if ack_status == "Succeeded" || ack_status == "Failed" {
            tracing::debug!(hci = %hci, ack_status = %ack_status, "command already terminal server-side, skipping execution");
            return;
        }

        if let Err(err) = self.tracker.create(&spec.deployment_id, &hci).await {
            tracing::error!(hci = %hci, error = %err, "failed to create tracker entry");
            self.complete_failed(&hci, &err).await;
            return;
        }
        let mut delete_guard = TrackerDeleteGuard::new(self.tracker.clone(), spec.deployment_id.clone(), hci.clone());

        let exec_result = self.executor.execute(&command.command_name, &spec).await;

        delete_guard.disarm();
        if let Err(err) = self.tracker.delete(&spec.deployment_id).await {
            tracing::warn!(hci = %hci, error = %err, "failed to delete tracker entry");
        }

        match exec_result {
            Ok(_log) => self.complete_succeeded(&hci).await,
            Err(err) => self.complete_failed(&hci, &err).await,
        }
    }

    async fn complete_succeeded(&self, hci: &str) {
        tracing::info!(hci = %hci, "command succeeded");
        let envelope = Envelope::json(Diagnostic::build_success(""));
        if let Err(err) = self.command_service.complete(hci, "Succeeded", envelope).await {
            tracing::error!(hci = %hci, error = %err, "failed to report Succeeded completion");
        }
    }

    async fn complete_failed(&self, hci: &str, err: &AgentError) {
        tracing::warn!(hci = %hci, error = %err, "command failed");
        let envelope = Envelope::json(Diagnostic::build_from_error(err));
        if let Err(err) = self.command_service.complete(hci, "Failed", envelope).await {
            tracing::error!(hci = %hci, error = %err, "failed to report Failed completion");
        }
    }

    /// Fixed 60s delay on throttle; otherwise randomized exponential
    /// backoff in `[base·2^n/2, base·2^n]`, `n = min(consecutiveErrors, cap)` (§4.7).
    fn compute_backoff(&self, err: &AgentError, consecutive_errors: u32) -> Duration {
        if err.is_throttle() {
            return Duration::from_secs(60);
        }
        let n = consecutive_errors.min(BACKOFF_EXPONENT_CAP);
        let base_secs = self.config.error_backoff_base.as_secs_f64();
        let max = base_secs * 2f64.powi(n as i32);
        let min = max / 2.0;
        let delay_secs = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            max
        };
        Duration::from_secs_f64(delay_secs)
    }
}

/// Waits for `delay` or until `cancel` fires, whichever is first. Returns
/// `true` if cancellation won the race.
async fn wait_or_cancel(delay: Duration, cancel: &CancelToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = cancel.cancelled() => true,
    }
}
