// Diagnostic encoder: serializes lifecycle result payloads with the
// stable numeric error taxonomy the Commands service expects back over
// the wire (§4.2 of the design spec).

use serde::{Serialize, Serializer};

use crate::error::AgentError;

/// Fallback payload emitted when `serde_json` somehow fails to encode an
/// ordinary `Diagnostic`. Kept as a literal string so it can never itself
/// fail to serialize.
const MARSHAL_ERROR_FALLBACK: &str =
    r#"{"error_code":5,"script_name":"","message":"marshal error","log":""}"#;

/// Closed taxonomy of lifecycle outcome codes. Values are pairwise distinct
/// and fall in `[0, 7]`; the discriminants below are load-bearing since they
/// are serialized as JSON numbers.
///
/// `serde`'s derive ignores `#[repr]`/discriminants for fieldless enums and
/// would serialize these as their variant name strings, not numbers, so
/// `Serialize` is implemented by hand here to emit the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    Succeeded = 0,
    ScriptMissing = 1,
    ScriptNotExecutable = 2,
    ScriptTimedOut = 3,
    ScriptFailed = 4,
    UnknownError = 5,
    OutputsLeftOpen = 6,
    FailedAfterRestart = 7,
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub error_code: ErrorCode,
    pub script_name: String,
    pub message: String,
    pub log: String,
}

impl Diagnostic {
    pub fn new(
        error_code: ErrorCode,
        script_name: impl Into<String>,
        message: impl Into<String>,
        log: impl Into<String>,
    ) -> Self {
        Self {
            error_code,
            script_name: script_name.into(),
            message: message.into(),
            log: log.into(),
        }
    }

    /// Renders the diagnostic as canonical JSON with snake_case keys.
    /// Ordinary strings cannot fail to serialize; on the pathological case
    /// where `serde_json` does fail, the fixed fallback is emitted instead
    /// so the caller always has a well-formed payload to send.
    pub fn build(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| MARSHAL_ERROR_FALLBACK.to_string())
    }

    pub fn build_success(message: impl Into<String>) -> String {
        Diagnostic::new(
            ErrorCode::Succeeded,
            "",
            format!("Succeeded: {}", message.into()),
            "",
        )
        .build()
    }

    pub fn build_from_error(err: &AgentError) -> String {
        Diagnostic::new(ErrorCode::UnknownError, "", err.to_string(), "").build()
    }

    pub fn build_failed_after_restart(message: impl Into<String>) -> String {
        Diagnostic::new(
            ErrorCode::FailedAfterRestart,
            "",
            format!("Failed: {}", message.into()),
            "",
        )
        .build()
    }
}
