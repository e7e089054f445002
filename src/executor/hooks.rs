use std::collections::HashMap;
use std::path::Path;

use crate::capabilities::{FileOperator, HookRunArgs, HookRunner};
use crate::error::AgentError;
use crate::layout::Layout;
use crate::spec::model::{Source, Spec};

pub fn build_hook_args(
    layout: &Layout,
    spec: &Spec,
    event_name: &str,
    most_recent: Option<String>,
    last_successful: Option<String>,
) -> HookRunArgs {
    HookRunArgs {
        deployment_id: spec.deployment_id.clone(),
        deployment_group_id: spec.deployment_group_id.clone(),
        application_name: spec.application_name.clone(),
        event_name: event_name.to_string(),
        archive_dir: layout.archive_dir(),
        deployment_root_dir: layout.deployment_root_dir(),
        most_recent,
        last_successful,
        env: source_env(&spec.source),
    }
}

fn source_env(source: &Source) -> HashMap<String, String> {
    let mut env = HashMap::new();
    match source {
        Source::S3 { bucket, key, version, etag, .. } => {
            env.insert("BUNDLE_BUCKET".to_string(), bucket.clone());
            env.insert("BUNDLE_KEY".to_string(), key.clone());
            env.insert("BUNDLE_VERSION".to_string(), version.clone().unwrap_or_default());
            env.insert("BUNDLE_ETAG".to_string(), etag.clone().unwrap_or_default());
        }
        Source::GitHub { commit_id, .. } => {
            env.insert("BUNDLE_COMMIT".to_string(), commit_id.clone());
        }
        Source::LocalFile { .. } | Source::LocalDirectory { .. } => {}
    }
    env
}

pub async fn run_hook_group(
    layout: &Layout,
    spec: &Spec,
    events: &[String],
    file_op: &dyn FileOperator,
    hook_runner: &dyn HookRunner,
) -> Result<String, AgentError> {
    let most_recent = read_pointer(file_op, &layout.most_recent_pointer()).await;
    let last_successful = read_pointer(file_op, &layout.last_successful_pointer()).await;

    let mut log = String::new();
    for event in events {
        let args = build_hook_args(layout, spec, event, most_recent.clone(), last_successful.clone());
        match hook_runner.run(&args).await {
            Ok(output) => log.push_str(&output),
            Err(err) => {
                file_op.create_dir_all(&layout.logs_dir()).await?;
                file_op.append_file(&layout.script_log_file(), log.as_bytes()).await?;
                return Err(err);
            }
        }
    }

    if !log.is_empty() {
        file_op.create_dir_all(&layout.logs_dir()).await?;
        file_op.append_file(&layout.script_log_file(), log.as_bytes()).await?;
    }

    Ok(log)
}

async fn read_pointer(file_op: &dyn FileOperator, path: &Path) -> Option<String> {
    if !file_op.exists(path).await {
        return None;
    }
    file_op.read_to_string(path).await.ok().map(|s| s.trim().to_string())
}
