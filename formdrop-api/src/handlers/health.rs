use crate::server::AppState;
use axum::extract::State;
use axum::response::Json;
use formdrop_store::RecordStore;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let path = state.appender.store().path();
    let meta = std::fs::metadata(path).ok();
    let size_bytes = meta.as_ref().map(|m| m.len());
    let last_modified_unix = meta
        .as_ref()
        .and_then(|m| m.modified().ok())
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs());

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "persistence": {
            "path": path.to_string_lossy(),
            "file_exists": meta.is_some(),
            "size_bytes": size_bytes,
            "last_modified_unix": last_modified_unix,
            "serialize_appends": state.appender.options().serialize_appends,
        },
    }))
}
