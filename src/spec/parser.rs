// Deployment-spec parser (§4.1): decodes and validates a signed or
// plaintext JSON envelope into a typed, immutable `Spec`.

use crate::capabilities::CertificateVerifier;
use crate::error::AgentError;
use crate::spec::envelope::{Envelope, Format};
use crate::spec::model::{RawSpec, Source, Spec};

const DEFAULT_DEPLOYMENT_CREATOR: &str = "user";
const DEFAULT_DEPLOYMENT_TYPE: &str = "IN_PLACE";
const DEFAULT_APP_SPEC_PATH: &str = "appspec.yml";
const DEFAULT_FILE_EXISTS_BEHAVIOR: &str = "DISALLOW";

const S3_BUNDLE_TYPES: &[&str] = &["tar", "tgz", "zip"];
const LOCAL_BUNDLE_TYPES: &[&str] = &["tar", "tgz", "zip", "directory"];

pub async fn parse(
    envelope: &Envelope,
    verifier: Option<&dyn CertificateVerifier>,
    allow_unsigned: bool,
) -> Result<Spec, AgentError> {
    if envelope.payload.is_empty() && envelope.format.is_empty() {
        return Err(AgentError::EnvelopeEmpty);
    }

    let format = Format::parse(&envelope.format)?;

    let plaintext = match format {
        Format::Pkcs7Json => {
            let verifier = verifier.ok_or(AgentError::VerifierMissing)?;
            verifier.verify(&envelope.payload).await?
        }
        Format::TextJson => {
            if !allow_unsigned {
                return Err(AgentError::UnsignedRejected);
            }
            envelope.payload.clone()
        }
    };

    if plaintext.is_empty() {
        return Err(AgentError::EnvelopeEmpty);
    }

    let raw: RawSpec = serde_json::from_slice(&plaintext)
        .map_err(|e| AgentError::JsonMalformed(e.to_string()))?;

    build_spec(raw)
}

fn build_spec(raw: RawSpec) -> Result<Spec, AgentError> {
    let raw_deployment_id = non_empty(raw.deployment_id, "DeploymentId")?;
    let deployment_id = extract_deployment_id(&raw_deployment_id);
    let deployment_group_id = non_empty(raw.deployment_group_id, "DeploymentGroupId")?;
    let deployment_group_name = non_empty(raw.deployment_group_name, "DeploymentGroupName")?;
    let application_name = non_empty(raw.application_name, "ApplicationName")?;

    let deployment_creator = raw
        .deployment_creator
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_DEPLOYMENT_CREATOR.to_string());
    let deployment_type = raw
        .deployment_type
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_DEPLOYMENT_TYPE.to_string());
    let app_spec_path = raw
        .app_spec_filename
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_APP_SPEC_PATH.to_string());

    let file_exists_behavior = raw
        .agent_action_overrides
        .and_then(|o| o.agent_overrides)
        .and_then(|o| o.file_exists_behavior)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_uppercase())
        .unwrap_or_else(|| DEFAULT_FILE_EXISTS_BEHAVIOR.to_string());

    let revision = raw
        .revision
        .ok_or(AgentError::FieldMissing("Revision"))?;
    let revision_type = non_empty(revision.revision_type, "Revision.RevisionType")?;

    let source = match revision_type.as_str() {
        "S3" => {
            let r = revision
                .s3_revision
                .ok_or(AgentError::FieldMissing("Revision.S3Revision"))?;
            let bucket = non_empty(r.bucket, "S3Revision.bucket")?;
            let key = non_empty(r.key, "S3Revision.key")?;
            let bundle_type = non_empty(r.bundle_type, "S3Revision.bundleType")?;
            if !S3_BUNDLE_TYPES.contains(&bundle_type.as_str()) {
                return Err(AgentError::BundleTypeInvalid {
                    source: "S3",
                    bundle_type,
                });
            }
            Source::S3 {
                bucket,
                key,
                bundle_type,
                version: r.version.filter(|v| !v.is_empty()),
                etag: r.etag.filter(|v| !v.is_empty()),
            }
        }
        "GitHub" => {
            let r = revision
                .github_revision
                .ok_or(AgentError::FieldMissing("Revision.GitHubRevision"))?;
            let account = non_empty(r.account, "GitHubRevision.account")?;
            let repository = non_empty(r.repository, "GitHubRevision.repository")?;
            let commit_id = non_empty(r.commit_id, "GitHubRevision.commitId")?;
            let token = raw.github_access_token.filter(|v| !v.is_empty());
            let anonymous = token.is_none();
            Source::GitHub {
                account,
                repository,
                commit_id,
                bundle_type: r.bundle_type,
                external_auth_token: token,
                anonymous,
            }
        }
        "Local File" => {
            let r = revision
                .local_revision
                .ok_or(AgentError::FieldMissing("Revision.LocalRevision"))?;
            let location = non_empty(r.location, "LocalRevision.location")?;
            let bundle_type = non_empty(r.bundle_type, "LocalRevision.bundleType")?;
            if !LOCAL_BUNDLE_TYPES.contains(&bundle_type.as_str()) {
                return Err(AgentError::BundleTypeInvalid {
                    source: "LocalFile",
                    bundle_type,
                });
            }
            Source::LocalFile { location, bundle_type }
        }
        "Local Directory" => {
            let r = revision
                .local_revision
                .ok_or(AgentError::FieldMissing("Revision.LocalRevision"))?;
            let location = non_empty(r.location, "LocalRevision.location")?;
            let bundle_type = r
                .bundle_type
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "directory".to_string());
            if !LOCAL_BUNDLE_TYPES.contains(&bundle_type.as_str()) {
                return Err(AgentError::BundleTypeInvalid {
                    source: "LocalDirectory",
                    bundle_type,
                });
            }
            Source::LocalDirectory { location, bundle_type }
        }
        other => return Err(AgentError::RevisionTypeUnsupported(other.to_string())),
    };

    Ok(Spec {
        deployment_id,
        deployment_group_id,
        deployment_group_name,
        application_name,
        deployment_creator,
        deployment_type,
        app_spec_path,
        file_exists_behavior,
        source,
        all_possible_lifecycle_events: raw.all_possible_lifecycle_events.unwrap_or_default(),
    })
}

fn non_empty(value: Option<String>, field: &'static str) -> Result<String, AgentError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AgentError::FieldMissing(field)),
    }
}

/// Extracts the deployment id from an ARN by splitting on `:` into (up to)
/// six parts, then splitting the final part on `/` into two. Any input not
/// prefixed `arn:` is returned unchanged (§8, §9 open question).
pub fn extract_deployment_id(input: &str) -> String {
    if !input.starts_with("arn:") {
        return input.to_string();
    }
    let parts: Vec<&str> = input.splitn(6, ':').collect();
    if parts.len() != 6 {
        return input.to_string();
    }
    match parts[5].splitn(2, '/').nth(1) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => input.to_string(),
    }
}
