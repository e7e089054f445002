// tokio::fs-backed implementation of `FileOperator` and `FileInstaller`
// (§6). The only concrete filesystem collaborator in the binary; tests
// everywhere else use `testutil::FakeFileOperator` instead.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::fs;

use crate::capabilities::{FileInstaller, FileOperator};
use crate::error::AgentError;

pub struct LocalFileSystem;

#[async_trait]
impl FileOperator for LocalFileSystem {
    async fn create_dir_all(&self, path: &Path) -> Result<(), AgentError> {
        Ok(fs::create_dir_all(path).await?)
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), AgentError> {
        Ok(fs::write(path, data).await?)
    }

    async fn append_file(&self, path: &Path, data: &[u8]) -> Result<(), AgentError> {
        use tokio::io::AsyncWriteExt;
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path).await?;
        file.write_all(data).await?;
        Ok(())
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, AgentError> {
        Ok(fs::read_to_string(path).await?)
    }

    async fn remove_file(&self, path: &Path) -> Result<(), AgentError> {
        Ok(fs::remove_file(path).await?)
    }

    async fn symlink(&self, src: &Path, dst: &Path) -> Result<(), AgentError> {
        Ok(tokio::fs::symlink(src, dst).await?)
    }

    async fn copy_dir_recursive(&self, src: &Path, dst: &Path) -> Result<(), AgentError> {
        copy_dir_recursive_inner(src, dst).await
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<(), AgentError> {
        Ok(fs::remove_dir_all(path).await?)
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).await.is_ok()
    }

    async fn list_dir_with_mod_time(&self, path: &Path) -> Result<Vec<(PathBuf, SystemTime)>, AgentError> {
        let mut out = Vec::new();
        let mut entries = fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            out.push((entry.path(), mtime));
        }
        Ok(out)
    }
}

fn copy_dir_recursive_inner<'a>(src: &'a Path, dst: &'a Path) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), AgentError>> + Send + 'a>> {
    Box::pin(async move {
        fs::create_dir_all(dst).await?;
        let mut entries = fs::read_dir(src).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let target = dst.join(entry.file_name());
            if file_type.is_dir() {
                copy_dir_recursive_inner(&entry.path(), &target).await?;
            } else {
                fs::copy(entry.path(), target).await?;
            }
        }
        Ok(())
    })
}

#[async_trait]
impl FileInstaller for LocalFileSystem {
    async fn mkdir_all(&self, path: &Path, mode: u32) -> Result<(), AgentError> {
        fs::create_dir_all(path).await?;
        set_mode(path, mode).await
    }

    async fn write_file(&self, path: &Path, data: &[u8], mode: u32) -> Result<(), AgentError> {
        fs::write(path, data).await?;
        set_mode(path, mode).await
    }

    async fn copy_file(&self, src: &Path, dst: &Path, mode: u32) -> Result<(), AgentError> {
        fs::copy(src, dst).await?;
        set_mode(dst, mode).await
    }

    async fn rename(&self, old: &Path, new: &Path) -> Result<(), AgentError> {
        Ok(fs::rename(old, new).await?)
    }
}

async fn set_mode(path: &Path, mode: u32) -> Result<(), AgentError> {
    let metadata = fs::metadata(path).await?;
    let mut perms = metadata.permissions();
    perms.set_mode(mode);
    fs::set_permissions(path, perms).await?;
    Ok(())
}
