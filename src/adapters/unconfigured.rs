// Placeholder adapters for the collaborators §1 declares out of scope:
// the remote Commands-service wire client, PKCS7 verification, the S3/
// GitHub downloader, bundle unpacking, appspec YAML parsing, the
// installer, and the hook script runner. None of these belong in this
// crate's dependency stack (no RPC client, no crypto library, no tar/zip,
// no YAML parser) — the capability traits are the seam a real deployment
// wires a concrete implementation into. These exist only so the binary
// has something to construct and run at startup; every method reports
// clearly that it is unconfigured rather than pretending to succeed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::capabilities::{
    AppSpec, AppSpecLoader, CertificateVerifier, CommandService, Downloader, HookRunArgs, HookRunner, Installer,
    Unpacker,
};
use crate::error::AgentError;
use crate::spec::envelope::Envelope;
use crate::spec::model::HostCommand;

pub struct UnconfiguredCommandService;

#[async_trait]
impl CommandService for UnconfiguredCommandService {
    async fn poll_host_command(&self, _host_id: &str) -> Result<Option<HostCommand>, AgentError> {
        Err(AgentError::Unknown(
            "no CommandService wired; inject a real Commands-service client before running in production".to_string(),
        ))
    }

    async fn acknowledge(&self, _host_command_identifier: &str, _envelope: Envelope) -> Result<String, AgentError> {
        Err(AgentError::Unknown("no CommandService wired".to_string()))
    }

    async fn complete(&self, _host_command_identifier: &str, _status: &str, _envelope: Envelope) -> Result<(), AgentError> {
        Err(AgentError::Unknown("no CommandService wired".to_string()))
    }

    async fn get_deployment_specification(
        &self,
        _deployment_execution_id: &str,
        _host_id: &str,
    ) -> Result<(Envelope, String), AgentError> {
        Err(AgentError::Unknown("no CommandService wired".to_string()))
    }
}

pub struct UnconfiguredVerifier;

#[async_trait]
impl CertificateVerifier for UnconfiguredVerifier {
    async fn verify(&self, _signature: &[u8]) -> Result<Vec<u8>, AgentError> {
        Err(AgentError::SignatureInvalid(
            "no CertificateVerifier wired; PKCS7/JSON envelopes cannot be verified in this build".to_string(),
        ))
    }
}

pub struct UnconfiguredDownloader;

#[async_trait]
impl Downloader for UnconfiguredDownloader {
    async fn download_s3(
        &self,
        _bucket: &str,
        _key: &str,
        _version: Option<&str>,
        _etag: Option<&str>,
        _dest: &Path,
    ) -> Result<(), AgentError> {
        Err(AgentError::DownloadFailed("no Downloader wired for S3 sources".to_string()))
    }

    async fn download_github(
        &self,
        _account: &str,
        _repository: &str,
        _commit_id: &str,
        _bundle_type: Option<&str>,
        _token: Option<&str>,
        _dest: &Path,
    ) -> Result<(), AgentError> {
        Err(AgentError::DownloadFailed("no Downloader wired for GitHub sources".to_string()))
    }
}

pub struct UnconfiguredUnpacker;

#[async_trait]
impl Unpacker for UnconfiguredUnpacker {
    async fn unpack(&self, _bundle_file: &Path, _archive_dir: &Path, _bundle_type: &str) -> Result<(), AgentError> {
        Err(AgentError::UnpackFailed("no Unpacker wired".to_string()))
    }
}

pub struct UnconfiguredAppSpecLoader;

#[async_trait]
impl AppSpecLoader for UnconfiguredAppSpecLoader {
    async fn find_app_spec_file(&self, _archive_dir: &Path, _app_spec_path: &str) -> Result<PathBuf, AgentError> {
        Err(AgentError::AppSpecMissing("no AppSpecLoader wired".to_string()))
    }

    async fn parse_file(&self, _path: &Path) -> Result<AppSpec, AgentError> {
        Err(AgentError::AppSpecInvalid("no AppSpecLoader wired".to_string()))
    }
}

pub struct UnconfiguredInstaller;

#[async_trait]
impl Installer for UnconfiguredInstaller {
    async fn install(
        &self,
        _deployment_group_id: &str,
        _archive_dir: &Path,
        _instructions_dir: &Path,
        _app_spec: &AppSpec,
        _file_exists_behavior: &str,
    ) -> Result<(), AgentError> {
        Err(AgentError::InstallFailed("no Installer wired".to_string()))
    }
}

/// Reports every lifecycle event as a no-op rather than failing outright,
/// since an unmapped hook runner should not turn every deployment group
/// into a hard failure before an operator has wired a real one in.
pub struct UnconfiguredHookRunner;

#[async_trait]
impl HookRunner for UnconfiguredHookRunner {
    async fn run(&self, args: &HookRunArgs) -> Result<String, AgentError> {
        Err(AgentError::HookFailed(format!(
            "no HookRunner wired; cannot run event {}",
            args.event_name
        )))
    }

    async fn is_noop(&self, _args: &HookRunArgs) -> bool {
        true
    }
}
