use crate::handlers;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{any, get},
};
use formdrop_core::config::default_metrics_path;
use formdrop_observability::SubmissionMetrics;
use formdrop_store::RecordAppender;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for the submission API.
pub struct AppState {
    pub appender: Arc<RecordAppender>,
    pub metrics: Arc<SubmissionMetrics>,
    /// Route the submission handler is mounted on.
    pub submit_path: String,
    /// Route for the prometheus scrape, if enabled.
    pub metrics_path: Option<String>,
}

impl AppState {
    pub fn new(appender: RecordAppender, metrics: SubmissionMetrics, submit_path: impl Into<String>) -> Self {
        let metrics_path = metrics.is_enabled().then(default_metrics_path);
        Self {
            appender: Arc::new(appender),
            metrics: Arc::new(metrics),
            submit_path: submit_path.into(),
            metrics_path,
        }
    }

    pub fn with_metrics_path(mut self, path: impl Into<String>) -> Self {
        if self.metrics.is_enabled() {
            self.metrics_path = Some(path.into());
        }
        self
    }
}

/// Build the axum router: submission, health, and (optionally) metrics.
///
/// The submission route accepts every verb; rejecting the wrong one is the
/// appender's job so the error envelope stays uniform.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route(&state.submit_path, any(handlers::submit::submit))
        .route("/health", get(handlers::health::health_check));

    if let Some(path) = &state.metrics_path {
        router = router.route(path, get(handlers::metrics::metrics));
    }

    router
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Submission API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formdrop_store::{AppendOptions, JsonArrayStore};

    fn appender() -> RecordAppender {
        RecordAppender::new(JsonArrayStore::new("unused.json"), AppendOptions::default())
    }

    #[test]
    fn metrics_path_follows_config_default() {
        let state = AppState::new(appender(), SubmissionMetrics::new(true).unwrap(), "/submit");
        assert_eq!(state.metrics_path, Some(default_metrics_path()));
    }

    #[test]
    fn metrics_path_can_be_overridden() {
        let state = AppState::new(appender(), SubmissionMetrics::new(true).unwrap(), "/submit")
            .with_metrics_path("/internal/metrics");
        assert_eq!(state.metrics_path.as_deref(), Some("/internal/metrics"));
    }

    #[test]
    fn no_metrics_route_when_disabled() {
        let state = AppState::new(appender(), SubmissionMetrics::disabled(), "/submit")
            .with_metrics_path("/internal/metrics");
        assert!(state.metrics_path.is_none());
    }
}
