use std::path::Path;

use chrono::Utc;

use crate::capabilities::{Downloader, FileOperator, Unpacker};
use crate::error::AgentError;
use crate::layout::Layout;
use crate::spec::model::{Source, Spec};

pub async fn download_bundle(
    layout: &Layout,
    spec: &Spec,
    max_revisions: usize,
    file_op: &dyn FileOperator,
    downloader: &dyn Downloader,
    unpacker: &dyn Unpacker,
) -> Result<String, AgentError> {
    clean_up_old_revisions(layout, spec, max_revisions, file_op).await?;

    file_op.create_dir_all(&layout.deployment_root_dir()).await?;
    file_op.create_dir_all(&layout.shared_deployment_logs_dir()).await?;

    let entry = format!(
        "[{}]{}  {}  {}  {}\n",
        Utc::now().to_rfc3339(),
        spec.deployment_id,
        spec.deployment_group_id,
        spec.application_name,
        spec.source.label(),
    );
    file_op
        .append_file(&layout.shared_deployment_log_file(), entry.as_bytes())
        .await?;

    let bundle_type = spec.source.bundle_type().unwrap_or("tar").to_string();
    let bundle_file = layout.bundle_file(&bundle_type);

    match &spec.source {
        Source::S3 { bucket, key, version, etag, .. } => {
            downloader
                .download_s3(bucket, key, version.as_deref(), etag.as_deref(), &bundle_file)
                .await?;
        }
        Source::GitHub { account, repository, commit_id, bundle_type, external_auth_token, .. } => {
            downloader
                .download_github(
                    account,
                    repository,
                    commit_id,
                    bundle_type.as_deref(),
                    external_auth_token.as_deref(),
                    &bundle_file,
                )
                .await?;
        }
        Source::LocalFile { location, .. } => {
            file_op.symlink(Path::new(location), &bundle_file).await?;
        }
        Source::LocalDirectory { location, .. } => {
            file_op.copy_dir_recursive(Path::new(location), &layout.archive_dir()).await?;
        }
    }

    if bundle_type != "directory" {
        let archive_dir = layout.archive_dir();
        if file_op.exists(&archive_dir).await {
            file_op.remove_dir_all(&archive_dir).await?;
        }
        unpacker.unpack(&bundle_file, &archive_dir, &bundle_type).await?;
    }

    file_op.create_dir_all(&layout.instructions_dir()).await?;
    file_op
        .write_file(
            &layout.most_recent_pointer(),
            layout.deployment_root_dir().to_string_lossy().as_bytes(),
        )
        .await?;

    Ok(format!("downloaded bundle for {}\n", spec.deployment_id))
}

/// Retention cleanup (§4.6): removes the oldest sibling deployment
/// directories under the group so at most `max_revisions - 1` remain
/// besides the one currently being downloaded.
async fn clean_up_old_revisions(
    layout: &Layout,
    spec: &Spec,
    max_revisions: usize,
    file_op: &dyn FileOperator,
) -> Result<(), AgentError> {
    let group_dir = layout.group_dir_for_listing();
    if !file_op.exists(&group_dir).await {
        return Ok(());
    }

    let last_successful = read_pointer(file_op, &layout.last_successful_pointer()).await;
    let current = layout.deployment_root_dir();

    let mut siblings: Vec<_> = file_op
        .list_dir_with_mod_time(&group_dir)
        .await?
        .into_iter()
        .filter(|(path, _)| *path != current)
        .filter(|(path, _)| last_successful.as_deref() != Some(path.to_string_lossy().as_ref()))
        .filter(|(path, _)| path != &layout.most_recent_pointer() && path != &layout.last_successful_pointer())
        .collect();

    let overflow = siblings.len() as i64 - max_revisions as i64 + 1;
    if overflow <= 0 {
        return Ok(());
    }

    siblings.sort_by_key(|(_, mtime)| *mtime);
    let to_remove = overflow as usize;
    for (path, _) in siblings.into_iter().take(to_remove) {
        file_op.remove_dir_all(&path).await?;
    }

    let _ = spec;
    Ok(())
}

async fn read_pointer(file_op: &dyn FileOperator, path: &Path) -> Option<String> {
    if !file_op.exists(path).await {
        return None;
    }
    file_op.read_to_string(path).await.ok().map(|s| s.trim().to_string())
}
