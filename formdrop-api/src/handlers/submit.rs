use crate::form::{client_info, read_fields};
use crate::response::{SuccessBody, error_response};
use crate::server::AppState;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use formdrop_core::{AppendError, FormFields};
use formdrop_store::{LoadOutcome, RecordStore, StoreDiagnostics};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Accept one submission, whatever the verb, and answer with a JSON envelope.
pub async fn submit(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let started = Instant::now();
    let (parts, body) = request.into_parts();
    let client = client_info(&parts);
    let method = parts.method.clone();
    let remote = client.remote_address.clone();

    // The verb check happens in the appender; a rejected verb's body is never read.
    let fields = if method == state.appender.options().accepted_method {
        read_fields(Request::from_parts(parts, body)).await
    } else {
        Ok(FormFields::new())
    };
    let fields = match fields {
        Ok(fields) => fields,
        Err(err) => {
            if let AppendError::BodyUnreadable { reason, .. } = &err {
                warn!(remote = %remote, reason = %reason, "submit: request body unreadable, nothing stored");
            }
            state
                .metrics
                .record_submission(err.kind(), err.status_code().as_u16());
            let diagnostics = StoreDiagnostics::probe(state.appender.store().path());
            return error_response(&err, diagnostics);
        }
    };
    let field_count = fields.len();

    let appender = Arc::clone(&state.appender);
    let outcome = tokio::task::spawn_blocking(move || {
        appender
            .append_with_report(&method, fields, client)
            .map_err(|e| {
                let diagnostics = StoreDiagnostics::probe(appender.store().path());
                (e, diagnostics)
            })
    })
    .await;

    let outcome = match outcome {
        Ok(result) => result,
        Err(join_error) => {
            let path = state.appender.store().path();
            let err = AppendError::persist_failure(path, Vec::new(), io::Error::other(join_error.to_string()));
            Err((err, StoreDiagnostics::probe(path)))
        }
    };

    match outcome {
        Ok(report) => {
            let recovered = matches!(report.load, LoadOutcome::Recovered { .. });
            info!(
                remote = %remote,
                fields = field_count,
                strategy = report.strategy,
                total = report.total,
                recovered,
                "submit: record appended"
            );
            state.metrics.record_submission("accepted", 200);
            state
                .metrics
                .record_write(report.strategy, recovered, started.elapsed().as_secs_f64());
            SuccessBody::new(report.record).into_response()
        }
        Err((err, diagnostics)) => {
            match &err {
                AppendError::MethodNotAllowed { method, .. } => {
                    warn!(remote = %remote, method = %method, "submit: method not allowed");
                }
                AppendError::BodyUnreadable { reason, .. } => {
                    warn!(remote = %remote, reason = %reason, "submit: request body unreadable");
                }
                AppendError::PersistFailure { attempts, source, .. } => {
                    error!(
                        remote = %remote,
                        error = %source,
                        attempts = ?attempts,
                        path = %diagnostics.file_path,
                        dir_writable = diagnostics.is_dir_writable,
                        file_exists = diagnostics.file_exists,
                        file_writable = diagnostics.file_writable,
                        "submit: persist failed"
                    );
                }
            }
            state
                .metrics
                .record_submission(err.kind(), err.status_code().as_u16());
            error_response(&err, diagnostics)
        }
    }
}
