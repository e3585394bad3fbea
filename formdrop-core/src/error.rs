use http::{Method, StatusCode};
use std::panic::Location;
use std::path::PathBuf;
use thiserror::Error;

/// Failure modes of appending a submission to the store.
///
/// Each variant remembers where it was raised so the error envelope can point
/// operators at the failing step.
#[derive(Error, Debug)]
pub enum AppendError {
    #[error("Only {expected} requests are allowed")]
    MethodNotAllowed {
        method: Method,
        expected: Method,
        location: &'static Location<'static>,
    },

    #[error("Failed to write to {} after multiple attempts", file_name(.path))]
    PersistFailure {
        path: PathBuf,
        /// Names of the write strategies tried, in order.
        attempts: Vec<&'static str>,
        source: std::io::Error,
        location: &'static Location<'static>,
    },

    #[error("Failed to read the request body")]
    BodyUnreadable {
        reason: String,
        location: &'static Location<'static>,
    },
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl AppendError {
    #[track_caller]
    pub fn method_not_allowed(method: Method, expected: Method) -> Self {
        AppendError::MethodNotAllowed {
            method,
            expected,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn persist_failure(
        path: impl Into<PathBuf>,
        attempts: Vec<&'static str>,
        source: std::io::Error,
    ) -> Self {
        AppendError::PersistFailure {
            path: path.into(),
            attempts,
            source,
            location: Location::caller(),
        }
    }

    /// The submission body could not be read or decoded in full.
    #[track_caller]
    pub fn body_unreadable(reason: impl std::fmt::Display) -> Self {
        AppendError::BodyUnreadable {
            reason: reason.to_string(),
            location: Location::caller(),
        }
    }

    /// Map to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppendError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AppendError::PersistFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppendError::BodyUnreadable { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Source location the error was raised at.
    pub fn location(&self) -> &'static Location<'static> {
        match self {
            AppendError::MethodNotAllowed { location, .. } => location,
            AppendError::PersistFailure { location, .. } => location,
            AppendError::BodyUnreadable { location, .. } => location,
        }
    }

    /// Short machine-friendly name, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            AppendError::MethodNotAllowed { .. } => "method_not_allowed",
            AppendError::PersistFailure { .. } => "persist_failure",
            AppendError::BodyUnreadable { .. } => "body_unreadable",
        }
    }
}
