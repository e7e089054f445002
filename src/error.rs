use thiserror::Error;

/// Closed error taxonomy for the agent core (§7 of the design spec).
///
/// Every fallible operation in the polling–dispatch–reconciliation pipeline
/// resolves to one of these variants. `Display` output feeds directly into
/// `buildFromError` when a command fails and needs to be reported upstream.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("envelope is empty")]
    EnvelopeEmpty,

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("unsigned envelope rejected (allowUnsigned is not set)")]
    UnsignedRejected,

    #[error("unsupported envelope format: {0}")]
    FormatUnsupported(String),

    #[error("PKCS7/JSON envelope received but no verifier is configured")]
    VerifierMissing,

    #[error("malformed deployment spec JSON: {0}")]
    JsonMalformed(String),

    #[error("required field missing: {0}")]
    FieldMissing(&'static str),

    #[error("unsupported revision type: {0}")]
    RevisionTypeUnsupported(String),

    #[error("invalid bundle type {bundle_type:?} for source {source}")]
    BundleTypeInvalid { source: &'static str, bundle_type: String },

    #[error("deploy system mismatch: expected CodeDeploy, got {0:?}")]
    SystemMismatch(Option<String>),

    #[error("deployment specification was empty")]
    NilSpec,

    #[error("bundle download failed: {0}")]
    DownloadFailed(String),

    #[error("bundle unpack failed: {0}")]
    UnpackFailed(String),

    #[error("appspec file not found under {0}")]
    AppSpecMissing(String),

    #[error("appspec is invalid: {0}")]
    AppSpecInvalid(String),

    #[error("install failed: {0}")]
    InstallFailed(String),

    #[error("lifecycle hook failed: {0}")]
    HookFailed(String),

    #[error("operation cancelled or timed out")]
    CancelOrTimeout,

    #[error("request was throttled by the remote service")]
    ThrottleExceeded,

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl AgentError {
    /// True when this error should drive the poller's fixed 60s throttle
    /// backoff instead of the randomized exponential backoff (§4.7).
    pub fn is_throttle(&self) -> bool {
        matches!(self, AgentError::ThrottleExceeded)
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::IoError(err.to_string())
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
