use thiserror::Error;

use crate::config::MessagesCfg;

/// Core error type for the summary widget.
/// Internally, modules can use `anyhow::Result<T>` for convenience,
/// but public boundaries should expose `CoreResult<T>` with this error.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Provisioning endpoint answered with a bad status or a malformed envelope.
    #[error("provisioning failed: {0}")]
    Provisioning(String),

    /// Backend set `response.error`; the payload is meant for the user.
    #[error("backend reported error: {0}")]
    BackendReported(String),

    #[error("unknown provider tag '{0}'")]
    UnknownProvider(String),

    #[error("upstream error from {provider}: {code} {message}")]
    Upstream {
        provider: String,
        code: String,
        message: String,
    },

    #[error("provider unavailable: {provider}")]
    Unavailable { provider: String },

    #[error("stream decode failed for {provider}: {message}")]
    StreamDecode { provider: String, message: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SummaryError {
    /// Stable short name used for telemetry and span fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Provisioning(_) => "provisioning",
            Self::BackendReported(_) => "backend_reported",
            Self::UnknownProvider(_) => "unknown_provider",
            Self::Upstream { .. } => "upstream_http",
            Self::Unavailable { .. } => "unavailable",
            Self::StreamDecode { .. } => "stream_decode",
            Self::Validation(_) => "validation",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }

    /// Text shown in the container. Only backend-reported errors carry a
    /// user-facing message; everything else collapses to the generic one.
    pub fn user_message(&self, messages: &MessagesCfg) -> String {
        match self {
            Self::BackendReported(msg) => msg.clone(),
            _ => messages.failure.clone(),
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, SummaryError>;
