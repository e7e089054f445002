// Shared capability interfaces (§6, §9). Each is a minimal async trait
// injected into the core; production wiring wraps a real collaborator
// (PKCS7 verification, an S3/GitHub client, a tar/zip unpacker, a
// subprocess-based hook runner, appspec YAML parsing, an init-system
// client), while tests substitute in-memory doubles. None of those real
// collaborators are implemented here — they are out of scope (§1) and
// live behind these narrow interfaces.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::spec::envelope::Envelope;
use crate::spec::model::HostCommand;

/// Verifies a PKCS7 signature and returns the plaintext JSON payload it
/// carries. The cryptography itself is out of scope (§1); this is the seam.
#[async_trait]
pub trait CertificateVerifier: Send + Sync {
    async fn verify(&self, signature: &[u8]) -> Result<Vec<u8>, AgentError>;
}

/// Wire client to the remote Commands service (§6). RPC/HTTP details and
/// credential signing are out of scope; this is the abstract contract the
/// poller drives.
#[async_trait]
pub trait CommandService: Send + Sync {
    async fn poll_host_command(
        &self,
        host_id: &str,
    ) -> Result<Option<HostCommand>, AgentError>;

    async fn acknowledge(
        &self,
        host_command_identifier: &str,
        envelope: Envelope,
    ) -> Result<String, AgentError>;

    async fn complete(
        &self,
        host_command_identifier: &str,
        status: &str,
        envelope: Envelope,
    ) -> Result<(), AgentError>;

    async fn get_deployment_specification(
        &self,
        deployment_execution_id: &str,
        host_id: &str,
    ) -> Result<(Envelope, String), AgentError>;
}

/// Fetches a bundle from S3 or GitHub into `dest`. Local sources are
/// handled directly by the command executor via `FileOperator` (symlink /
/// recursive copy), since they require no network client.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download_s3(
        &self,
        bucket: &str,
        key: &str,
        version: Option<&str>,
        etag: Option<&str>,
        dest: &Path,
    ) -> Result<(), AgentError>;

    async fn download_github(
        &self,
        account: &str,
        repository: &str,
        commit_id: &str,
        bundle_type: Option<&str>,
        token: Option<&str>,
        dest: &Path,
    ) -> Result<(), AgentError>;
}

/// Unpacks a downloaded bundle (tar/tgz/zip) into the archive directory.
#[async_trait]
pub trait Unpacker: Send + Sync {
    async fn unpack(&self, bundle_file: &Path, archive_dir: &Path, bundle_type: &str) -> Result<(), AgentError>;
}

/// Arguments passed to a single lifecycle hook invocation (§4.6).
#[derive(Debug, Clone)]
pub struct HookRunArgs {
    pub deployment_id: String,
    pub deployment_group_id: String,
    pub application_name: String,
    pub event_name: String,
    pub archive_dir: PathBuf,
    pub deployment_root_dir: PathBuf,
    pub most_recent: Option<String>,
    pub last_successful: Option<String>,
    pub env: HashMap<String, String>,
}

/// Runs a single named lifecycle event script (BeforeInstall, etc).
/// Subprocess execution and timeouts are out of scope (§1).
#[async_trait]
pub trait HookRunner: Send + Sync {
    async fn run(&self, args: &HookRunArgs) -> Result<String, AgentError>;

    /// True when the named event has nothing to execute (no script mapped
    /// to it for this revision) — used by `CommandExecutor::is_noop`.
    async fn is_noop(&self, args: &HookRunArgs) -> bool;
}

/// Parsed appspec, opaque to the core beyond what `Installer::install`
/// needs; appspec YAML parsing itself is out of scope (§1).
#[derive(Debug, Clone)]
pub struct AppSpec {
    pub raw: serde_json::Value,
}

/// Locates and parses the appspec file for a revision. Out of scope by
/// implementation (YAML grammar); the core only calls through this seam.
#[async_trait]
pub trait AppSpecLoader: Send + Sync {
    async fn find_app_spec_file(&self, archive_dir: &Path, app_spec_path: &str) -> Result<PathBuf, AgentError>;
    async fn parse_file(&self, path: &Path) -> Result<AppSpec, AgentError>;
}

/// Installs files declared by an appspec's `files` section into their
/// destinations, honoring `file_exists_behavior`.
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(
        &self,
        deployment_group_id: &str,
        archive_dir: &Path,
        instructions_dir: &Path,
        app_spec: &AppSpec,
        file_exists_behavior: &str,
    ) -> Result<(), AgentError>;
}

/// General-purpose filesystem capability used by the tracker, layout
/// bookkeeping, and command executor (distinct from `FileInstaller`,
/// which is scoped to what self-install reconciliation needs — §6).
#[async_trait]
pub trait FileOperator: Send + Sync {
    async fn create_dir_all(&self, path: &Path) -> Result<(), AgentError>;
    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), AgentError>;
    async fn append_file(&self, path: &Path, data: &[u8]) -> Result<(), AgentError>;
    async fn read_to_string(&self, path: &Path) -> Result<String, AgentError>;
    async fn remove_file(&self, path: &Path) -> Result<(), AgentError>;
    async fn symlink(&self, src: &Path, dst: &Path) -> Result<(), AgentError>;
    async fn copy_dir_recursive(&self, src: &Path, dst: &Path) -> Result<(), AgentError>;
    async fn remove_dir_all(&self, path: &Path) -> Result<(), AgentError>;
    async fn exists(&self, path: &Path) -> bool;
    /// Lists immediate child directories together with their modification
    /// times, used by retention cleanup to find the oldest siblings.
    async fn list_dir_with_mod_time(&self, path: &Path) -> Result<Vec<(PathBuf, SystemTime)>, AgentError>;
}

/// Narrow filesystem capability for the self-install subsystem (§4.4, §6).
#[async_trait]
pub trait FileInstaller: Send + Sync {
    async fn mkdir_all(&self, path: &Path, mode: u32) -> Result<(), AgentError>;
    async fn write_file(&self, path: &Path, data: &[u8], mode: u32) -> Result<(), AgentError>;
    async fn copy_file(&self, src: &Path, dst: &Path, mode: u32) -> Result<(), AgentError>;
    async fn rename(&self, old: &Path, new: &Path) -> Result<(), AgentError>;
}

/// Init-system control for the self-install subsystem (§4.4, §6).
#[async_trait]
pub trait ServiceController: Send + Sync {
    async fn enable(&self, service_name: &str) -> Result<(), AgentError>;
    async fn start(&self, service_name: &str) -> Result<(), AgentError>;
    async fn daemon_reload(&self) -> Result<(), AgentError>;
}
