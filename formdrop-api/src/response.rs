//! JSON envelopes returned by the submission endpoint.

use axum::Json;
use axum::response::{IntoResponse, Response};
use formdrop_core::{AppendError, Record};
use formdrop_store::StoreDiagnostics;
use http::StatusCode;
use serde::Serialize;

pub const SUCCESS_MESSAGE: &str = "Data received and saved";

#[derive(Debug, Serialize)]
pub struct SuccessBody {
    pub status: &'static str,
    pub message: &'static str,
    pub received_data: Record,
}

/// Uniform failure envelope, whatever went wrong.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub additional_info: StoreDiagnostics,
}

impl SuccessBody {
    pub fn new(record: Record) -> Self {
        Self {
            status: "success",
            message: SUCCESS_MESSAGE,
            received_data: record,
        }
    }
}

impl ErrorBody {
    pub fn new(err: &AppendError, diagnostics: StoreDiagnostics) -> Self {
        let location = err.location();
        Self {
            status: "error",
            message: err.to_string(),
            file: location.file().to_string(),
            line: location.line(),
            additional_info: diagnostics,
        }
    }
}

impl IntoResponse for SuccessBody {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Map an append failure to its status code and envelope.
pub fn error_response(err: &AppendError, diagnostics: StoreDiagnostics) -> Response {
    (err.status_code(), Json(ErrorBody::new(err, diagnostics))).into_response()
}
