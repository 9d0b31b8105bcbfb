// src/ingest/error.rs
use thiserror::Error;

/// Why a single provider call did not yield a record set.
///
/// Every variant carries owned strings so stub transports can replay a failure
/// and the run summary can print it after the fact.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Network failure, timeout or non-2xx HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// Well-formed response that carries the provider's own error payload.
    #[error("{provider} returned an error: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// Response parsed but lacked the fields or rows we need.
    #[error("unexpected response shape: {0}")]
    DataShape(String),

    /// A required credential is absent, so the provider was never called.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// The optional feature is switched off by leaving its credential unset.
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl FetchError {
    /// Short stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Provider { .. } => "provider",
            FetchError::DataShape(_) => "data_shape",
            FetchError::MissingCredential(_) => "missing_credential",
            FetchError::NotConfigured(_) => "not_configured",
        }
    }

    pub fn is_not_configured(&self) -> bool {
        matches!(self, FetchError::NotConfigured(_))
    }

    pub(crate) fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        FetchError::Provider {
            provider,
            message: message.into(),
        }
    }
}
