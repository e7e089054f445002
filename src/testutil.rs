// In-memory test doubles for every capability trait (§8 ambient test
// coverage). Shared across the tracker, layout, command-executor,
// self-install-executor, and poller test modules.

#![cfg(test)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::capabilities::{
    AppSpec, AppSpecLoader, CertificateVerifier, CommandService, Downloader, FileInstaller,
    FileOperator, HookRunArgs, HookRunner, Installer, ServiceController, Unpacker,
};
use crate::error::AgentError;
use crate::spec::envelope::Envelope;
use crate::spec::model::HostCommand;

#[derive(Debug, Clone)]
struct Entry {
    data: Vec<u8>,
    is_dir: bool,
    mtime: SystemTime,
}

/// In-memory filesystem double backing both `FileOperator` and
/// `FileInstaller`. Directories are tracked as entries with `is_dir=true`
/// so `exists`/listing work without a real filesystem.
#[derive(Default)]
pub struct FakeFileOperator {
    entries: Mutex<HashMap<PathBuf, Entry>>,
}

impl FakeFileOperator {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn mark_dir(&self, path: &Path) {
        let mut entries = self.entries.lock().unwrap();
        let mut p = PathBuf::new();
        for component in path.components() {
            p.push(component);
            entries.entry(p.clone()).or_insert(Entry {
                data: Vec::new(),
                is_dir: true,
                mtime: SystemTime::now(),
            });
        }
    }

    pub fn read(&self, path: &Path) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(path).map(|e| e.data.clone())
    }

    pub fn write_raw(&self, path: &Path, data: Vec<u8>) {
        self.mark_dir(path.parent().unwrap_or_else(|| Path::new("/")));
        self.entries.lock().unwrap().insert(
            path.to_path_buf(),
            Entry {
                data,
                is_dir: false,
                mtime: SystemTime::now(),
            },
        );
    }

    pub fn mkdir(&self, path: &Path) {
        self.mark_dir(path);
    }
}

#[async_trait]
impl FileOperator for FakeFileOperator {
    async fn create_dir_all(&self, path: &Path) -> Result<(), AgentError> {
        self.mark_dir(path);
        Ok(())
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), AgentError> {
        self.write_raw(path, data.to_vec());
        Ok(())
    }

    async fn append_file(&self, path: &Path, data: &[u8]) -> Result<(), AgentError> {
        self.mark_dir(path.parent().unwrap_or_else(|| Path::new("/")));
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(path.to_path_buf()).or_insert(Entry {
            data: Vec::new(),
            is_dir: false,
            mtime: SystemTime::now(),
        });
        entry.data.extend_from_slice(data);
        entry.mtime = SystemTime::now();
        Ok(())
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, AgentError> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(e) => String::from_utf8(e.data.clone())
                .map_err(|e| AgentError::IoError(e.to_string())),
            None => Err(AgentError::IoError(format!("not found: {}", path.display()))),
        }
    }

    async fn remove_file(&self, path: &Path) -> Result<(), AgentError> {
        self.entries.lock().unwrap().remove(path);
        Ok(())
    }

    async fn symlink(&self, src: &Path, dst: &Path) -> Result<(), AgentError> {
        let data = self
            .entries
            .lock()
            .unwrap()
            .get(src)
            .map(|e| e.data.clone())
            .unwrap_or_default();
        self.write_raw(dst, data);
        Ok(())
    }

    async fn copy_dir_recursive(&self, src: &Path, dst: &Path) -> Result<(), AgentError> {
        let snapshot: Vec<(PathBuf, Entry)> = {
            let entries = self.entries.lock().unwrap();
            entries
                .iter()
                .filter(|(p, _)| p.starts_with(src))
                .map(|(p, e)| (p.clone(), e.clone()))
                .collect()
        };
        self.mark_dir(dst);
        for (path, entry) in snapshot {
            let rel = path.strip_prefix(src).unwrap_or(&path);
            let target = dst.join(rel);
            if entry.is_dir {
                self.mark_dir(&target);
            } else {
                self.write_raw(&target, entry.data);
            }
        }
        Ok(())
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<(), AgentError> {
        self.entries.lock().unwrap().retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.entries.lock().unwrap().contains_key(path)
    }

    async fn list_dir_with_mod_time(&self, path: &Path) -> Result<Vec<(PathBuf, SystemTime)>, AgentError> {
        let entries = self.entries.lock().unwrap();
        let mut out = Vec::new();
        for (p, e) in entries.iter() {
            if p.parent() == Some(path) && p != path {
                out.push((p.clone(), e.mtime));
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl FileInstaller for FakeFileOperator {
    async fn mkdir_all(&self, path: &Path, _mode: u32) -> Result<(), AgentError> {
        self.mark_dir(path);
        Ok(())
    }

    async fn write_file(&self, path: &Path, data: &[u8], _mode: u32) -> Result<(), AgentError> {
        self.write_raw(path, data.to_vec());
        Ok(())
    }

    async fn copy_file(&self, src: &Path, dst: &Path, _mode: u32) -> Result<(), AgentError> {
        let data = self
            .entries
            .lock()
            .unwrap()
            .get(src)
            .map(|e| e.data.clone())
            .ok_or_else(|| AgentError::IoError(format!("source not found: {}", src.display())))?;
        self.write_raw(dst, data);
        Ok(())
    }

    async fn rename(&self, old: &Path, new: &Path) -> Result<(), AgentError> {
        let entry = self
            .entries
            .lock()
            .unwrap()
            .remove(old)
            .ok_or_else(|| AgentError::IoError(format!("source not found: {}", old.display())))?;
        self.entries.lock().unwrap().insert(new.to_path_buf(), entry);
        Ok(())
    }
}

/// Scriptable in-memory service controller; records every call made.
#[derive(Default)]
pub struct FakeServiceController {
    pub enabled: Mutex<Vec<String>>,
    pub started: Mutex<Vec<String>>,
    pub reload_count: Mutex<u32>,
}

impl FakeServiceController {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ServiceController for FakeServiceController {
    async fn enable(&self, service_name: &str) -> Result<(), AgentError> {
        self.enabled.lock().unwrap().push(service_name.to_string());
        Ok(())
    }

    async fn start(&self, service_name: &str) -> Result<(), AgentError> {
        self.started.lock().unwrap().push(service_name.to_string());
        Ok(())
    }

    async fn daemon_reload(&self) -> Result<(), AgentError> {
        *self.reload_count.lock().unwrap() += 1;
        Ok(())
    }
}

/// Scriptable command service double: returns a fixed queue of poll
/// responses and records every ack/complete call for assertion.
pub struct FakeCommandService {
    pub poll_queue: Mutex<Vec<Result<Option<HostCommand>, AgentError>>>,
    pub spec_responses: Mutex<HashMap<String, Result<(Envelope, String), AgentError>>>,
    pub ack_responses: Mutex<HashMap<String, String>>,
    pub calls: Mutex<Vec<String>>,
    pub completions: Mutex<Vec<(String, String, String)>>,
}

impl FakeCommandService {
    pub fn new() -> Self {
        Self {
            poll_queue: Mutex::new(Vec::new()),
            spec_responses: Mutex::new(HashMap::new()),
            ack_responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CommandService for FakeCommandService {
    async fn poll_host_command(&self, _host_id: &str) -> Result<Option<HostCommand>, AgentError> {
        self.calls.lock().unwrap().push("poll".to_string());
        let mut queue = self.poll_queue.lock().unwrap();
        if queue.is_empty() {
            return Ok(None);
        }
        queue.remove(0)
    }

    async fn acknowledge(&self, host_command_identifier: &str, _envelope: Envelope) -> Result<String, AgentError> {
        self.calls.lock().unwrap().push("acknowledge".to_string());
        Ok(self
            .ack_responses
            .lock()
            .unwrap()
            .get(host_command_identifier)
            .cloned()
            .unwrap_or_else(|| "InProgress".to_string()))
    }

    async fn complete(&self, host_command_identifier: &str, status: &str, envelope: Envelope) -> Result<(), AgentError> {
        self.calls.lock().unwrap().push("complete".to_string());
        self.completions.lock().unwrap().push((
            host_command_identifier.to_string(),
            status.to_string(),
            String::from_utf8_lossy(&envelope.payload).to_string(),
        ));
        Ok(())
    }

    async fn get_deployment_specification(
        &self,
        deployment_execution_id: &str,
        _host_id: &str,
    ) -> Result<(Envelope, String), AgentError> {
        self.calls.lock().unwrap().push("get_spec".to_string());
        self.spec_responses
            .lock()
            .unwrap()
            .get(deployment_execution_id)
            .cloned()
            .unwrap_or_else(|| Err(AgentError::NilSpec))
    }
}

pub struct FixedVerifier {
    pub plaintext: Vec<u8>,
}

#[async_trait]
impl CertificateVerifier for FixedVerifier {
    async fn verify(&self, _signature: &[u8]) -> Result<Vec<u8>, AgentError> {
        Ok(self.plaintext.clone())
    }
}

#[derive(Default)]
pub struct FakeDownloader {
    pub fail: bool,
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download_s3(
        &self,
        _bucket: &str,
        _key: &str,
        _version: Option<&str>,
        _etag: Option<&str>,
        dest: &Path,
    ) -> Result<(), AgentError> {
        if self.fail {
            return Err(AgentError::DownloadFailed("forced failure".to_string()));
        }
        let _ = dest;
        Ok(())
    }

    async fn download_github(
        &self,
        _account: &str,
        _repository: &str,
        _commit_id: &str,
        _bundle_type: Option<&str>,
        _token: Option<&str>,
        dest: &Path,
    ) -> Result<(), AgentError> {
        if self.fail {
            return Err(AgentError::DownloadFailed("forced failure".to_string()));
        }
        let _ = dest;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeUnpacker {
    pub fail: bool,
}

#[async_trait]
impl Unpacker for FakeUnpacker {
    async fn unpack(&self, _bundle_file: &Path, _archive_dir: &Path, _bundle_type: &str) -> Result<(), AgentError> {
        if self.fail {
            return Err(AgentError::UnpackFailed("forced failure".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeAppSpecLoader;

#[async_trait]
impl AppSpecLoader for FakeAppSpecLoader {
    async fn find_app_spec_file(&self, archive_dir: &Path, app_spec_path: &str) -> Result<PathBuf, AgentError> {
        Ok(archive_dir.join(app_spec_path))
    }

    async fn parse_file(&self, _path: &Path) -> Result<AppSpec, AgentError> {
        Ok(AppSpec {
            raw: serde_json::json!({}),
        })
    }
}

#[derive(Default)]
pub struct FakeInstaller {
    pub fail: bool,
}

#[async_trait]
impl Installer for FakeInstaller {
    async fn install(
        &self,
        _deployment_group_id: &str,
        _archive_dir: &Path,
        _instructions_dir: &Path,
        _app_spec: &AppSpec,
        _file_exists_behavior: &str,
    ) -> Result<(), AgentError> {
        if self.fail {
            return Err(AgentError::InstallFailed("forced failure".to_string()));
        }
        Ok(())
    }
}

/// Hook runner double: every event succeeds with a fixed log line unless
/// its name is in `failing_events`.
#[derive(Default)]
pub struct FakeHookRunner {
    pub failing_events: Vec<String>,
    pub noop_events: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl HookRunner for FakeHookRunner {
    async fn run(&self, args: &HookRunArgs) -> Result<String, AgentError> {
        self.calls.lock().unwrap().push(args.event_name.clone());
        if self.failing_events.contains(&args.event_name) {
            return Err(AgentError::HookFailed(format!("{} failed", args.event_name)));
        }
        Ok(format!("ran {}\n", args.event_name))
    }

    async fn is_noop(&self, args: &HookRunArgs) -> bool {
        self.noop_events.contains(&args.event_name)
    }
}
