use crate::capabilities::{AppSpecLoader, FileOperator, Installer};
use crate::error::AgentError;
use crate::layout::Layout;
use crate::spec::model::Spec;

pub async fn install(
    layout: &Layout,
    spec: &Spec,
    file_op: &dyn FileOperator,
    appspec_loader: &dyn AppSpecLoader,
    installer: &dyn Installer,
) -> Result<String, AgentError> {
    let appspec_file = appspec_loader
        .find_app_spec_file(&layout.archive_dir(), &spec.app_spec_path)
        .await?;
    let app_spec = appspec_loader.parse_file(&appspec_file).await?;

    installer
        .install(
            &spec.deployment_group_id,
            &layout.archive_dir(),
            &layout.instructions_dir(),
            &app_spec,
            &spec.file_exists_behavior,
        )
        .await?;

    file_op
        .write_file(
            &layout.last_successful_pointer(),
            layout.deployment_root_dir().to_string_lossy().as_bytes(),
        )
        .await?;

    Ok(format!("installed {}\n", spec.deployment_id))
}
