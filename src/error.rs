//! Classified store failures.
//!
//! Every operation on [`crate::Store`] resolves to either its payload or one of
//! the four kinds below. Callers that need a wire shape use [`StoreError::report`].

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Bad caller input. No upstream call was made.
    #[error("{0}")]
    Validation(String),

    #[error("post '{slug}' not found")]
    NotFound { slug: String },

    /// The forge or the git transport failed. `status` is the HTTP status when there was one.
    #[error("{}", upstream_display(.status, .message))]
    Upstream { status: Option<u16>, message: String },

    /// Required settings are absent. No upstream call was made.
    #[error("missing configuration: {}", .0.join(", "))]
    ConfigurationMissing(Vec<String>),
}

fn upstream_display(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("GitHub API error ({code}): {message}"),
        None => format!("upstream failure: {message}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    UpstreamFailure,
    ConfigurationMissing,
}

/// `{kind, message}` as handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StoreError::Validation(msg.into())
    }

    pub fn not_found(slug: impl Into<String>) -> Self {
        StoreError::NotFound { slug: slug.into() }
    }

    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        StoreError::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Flatten an `anyhow` chain (e.g. "git push: remote rejected ...") into an upstream failure.
    pub fn from_chain(err: anyhow::Error) -> Self {
        StoreError::upstream(None, format!("{:#}", err))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Upstream { .. } => ErrorKind::UpstreamFailure,
            StoreError::ConfigurationMissing(_) => ErrorKind::ConfigurationMissing,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        if e.is_timeout() {
            StoreError::upstream(status, "request to GitHub timed out")
        } else {
            StoreError::upstream(status, e.to_string())
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
