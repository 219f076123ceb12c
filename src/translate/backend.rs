use std::fmt;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::language::Language;
use super::sanitize::sanitize_response;

/// Everything one backend call can end in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendResponse {
    /// Raw generated text, not yet sanitized
    Completion(String),
    ConnectionFailed(String),
    TimedOut,
    HttpError { status: u16, body: String },
    Malformed(String),
}

impl fmt::Display for BackendResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completion(text) => write!(f, "completion ({} bytes)", text.len()),
            Self::ConnectionFailed(reason) => write!(f, "connection failed: {}", reason),
            Self::TimedOut => write!(f, "request timed out"),
            Self::HttpError { status, body } => write!(f, "HTTP {}: {}", status, body),
            Self::Malformed(reason) => write!(f, "malformed response: {}", reason),
        }
    }
}

/// A text-generation service that can translate one piece of text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Submit `text` for translation and return the raw outcome. One attempt,
    /// no retries.
    async fn generate(&self, text: &str, source: &Language, target: &Language) -> BackendResponse;
}

/// Translate one subtitle text: call the backend once and sanitize the
/// completion. Every failure class collapses to `None`.
pub async fn translate_unit(
    backend: &dyn TranslationBackend,
    text: &str,
    source: &Language,
    target: &Language,
) -> Option<String> {
    match backend.generate(text, source, target).await {
        BackendResponse::Completion(raw) => {
            debug!("Raw backend response: {}", raw);
            Some(sanitize_response(&raw, &source.name, &target.name))
        }
        failure => {
            warn!("Backend gave no result: {}", failure);
            None
        }
    }
}
