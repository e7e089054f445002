use crate::error::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pkcs7Json,
    TextJson,
}

impl Format {
    pub fn parse(raw: &str) -> Result<Self, AgentError> {
        match raw {
            "PKCS7/JSON" => Ok(Format::Pkcs7Json),
            "TEXT/JSON" => Ok(Format::TextJson),
            other => Err(AgentError::FormatUnsupported(other.to_string())),
        }
    }
}

/// A `(format, payload)` pair carrying either a deployment spec or a
/// diagnostic. `payload` is opaque bytes until the format is resolved.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub format: String,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn new(format: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            format: format.into(),
            payload,
        }
    }

    /// The diagnostic envelope sent back to the Commands service is always
    /// tagged `"JSON"`, not one of the two spec-carrying formats.
    pub fn json(payload: impl Into<String>) -> Self {
        Self {
            format: "JSON".to_string(),
            payload: payload.into().into_bytes(),
        }
    }
}
