use serde::Deserialize;

/// A validated, immutable deployment specification (§3). Constructed only
/// by `parser::parse`; nothing downstream mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spec {
    pub deployment_id: String,
    pub deployment_group_id: String,
    pub deployment_group_name: String,
    pub application_name: String,
    pub deployment_creator: String,
    pub deployment_type: String,
    pub app_spec_path: String,
    pub file_exists_behavior: String,
    pub source: Source,
    pub all_possible_lifecycle_events: Vec<String>,
}

/// Tagged variant over the four revision sources. Validation is exhaustive
/// per tag in the parser rather than shared across an inheritance
/// hierarchy (§9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    S3 {
        bucket: String,
        key: String,
        bundle_type: String,
        version: Option<String>,
        etag: Option<String>,
    },
    GitHub {
        account: String,
        repository: String,
        commit_id: String,
        bundle_type: Option<String>,
        external_auth_token: Option<String>,
        anonymous: bool,
    },
    LocalFile {
        location: String,
        bundle_type: String,
    },
    LocalDirectory {
        location: String,
        bundle_type: String,
    },
}

impl Source {
    /// Tag used in the shared deployment-log line and as the environment
    /// discriminant in hook run args.
    pub fn label(&self) -> &'static str {
        match self {
            Source::S3 { .. } => "S3",
            Source::GitHub { .. } => "GitHub",
            Source::LocalFile { .. } => "LocalFile",
            Source::LocalDirectory { .. } => "LocalDirectory",
        }
    }

    pub fn bundle_type(&self) -> Option<&str> {
        match self {
            Source::S3 { bundle_type, .. } => Some(bundle_type.as_str()),
            Source::GitHub { bundle_type, .. } => bundle_type.as_deref(),
            Source::LocalFile { bundle_type, .. } => Some(bundle_type.as_str()),
            Source::LocalDirectory { bundle_type, .. } => Some(bundle_type.as_str()),
        }
    }
}

/// A unit of work issued by the Commands service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    pub host_command_identifier: String,
    pub host_identifier: String,
    pub deployment_execution_id: String,
    pub command_name: String,
}

// -- Wire JSON shape, as decoded from the inner envelope payload (§6) --

#[derive(Debug, Deserialize)]
pub struct RawSpec {
    #[serde(rename = "DeploymentId")]
    pub deployment_id: Option<String>,
    #[serde(rename = "DeploymentGroupId")]
    pub deployment_group_id: Option<String>,
    #[serde(rename = "DeploymentGroupName")]
    pub deployment_group_name: Option<String>,
    #[serde(rename = "ApplicationName")]
    pub application_name: Option<String>,
    #[serde(rename = "DeploymentCreator")]
    pub deployment_creator: Option<String>,
    #[serde(rename = "DeploymentType")]
    pub deployment_type: Option<String>,
    #[serde(rename = "AppSpecFilename")]
    pub app_spec_filename: Option<String>,
    #[serde(rename = "Revision")]
    pub revision: Option<RawRevision>,
    #[serde(rename = "GitHubAccessToken")]
    pub github_access_token: Option<String>,
    #[serde(rename = "AgentActionOverrides")]
    pub agent_action_overrides: Option<RawAgentActionOverrides>,
    #[serde(rename = "AllPossibleLifecycleEvents")]
    pub all_possible_lifecycle_events: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct RawRevision {
    #[serde(rename = "RevisionType")]
    pub revision_type: Option<String>,
    #[serde(rename = "S3Revision")]
    pub s3_revision: Option<RawS3Revision>,
    #[serde(rename = "GitHubRevision")]
    pub github_revision: Option<RawGitHubRevision>,
    #[serde(rename = "LocalRevision")]
    pub local_revision: Option<RawLocalRevision>,
}

#[derive(Debug, Deserialize)]
pub struct RawS3Revision {
    pub bucket: Option<String>,
    pub key: Option<String>,
    #[serde(rename = "bundleType")]
    pub bundle_type: Option<String>,
    pub version: Option<String>,
    pub etag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawGitHubRevision {
    pub account: Option<String>,
    pub repository: Option<String>,
    #[serde(rename = "commitId")]
    pub commit_id: Option<String>,
    #[serde(rename = "bundleType")]
    pub bundle_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawLocalRevision {
    pub location: Option<String>,
    #[serde(rename = "bundleType")]
    pub bundle_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawAgentActionOverrides {
    #[serde(rename = "AgentOverrides")]
    pub agent_overrides: Option<RawAgentOverrides>,
}

#[derive(Debug, Deserialize)]
pub struct RawAgentOverrides {
    #[serde(rename = "FileExistsBehavior")]
    pub file_exists_behavior: Option<String>,
}
