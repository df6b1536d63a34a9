use crate::server::AppState;
use axum::routing::get;
use axum::{Extension, Json};
use chrono::Utc;
use std::sync::Arc;

pub fn router() -> axum::Router {
    axum::Router::new().route("/api/v1/health", get(get_health))
}

#[tracing::instrument(level = "debug", skip_all)]
async fn get_health(Extension(state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    let docgen = match state.generator.as_ref() {
        Some(generator) => serde_json::json!({
            "enabled": true,
            "output_dir": generator.output_dir().display().to_string(),
            "memo_entries": generator.memo_len().await,
        }),
        None => serde_json::json!({ "enabled": false }),
    };

    Json(serde_json::json!({
        "status": "ok",
        "checked_at": Utc::now(),
        "tools": state.tools.keys().collect::<Vec<_>>(),
        "checks": { "docgen": docgen }
    }))
}
