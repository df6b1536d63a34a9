use crate::server::AppState;
use axum::body::Bytes;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json};
use ca_tools::ToolError;
use serde_json::json;
use std::sync::Arc;

pub fn router() -> axum::Router {
    axum::Router::new()
        .route("/api/v1/tools", get(list_tools))
        .route("/api/v1/tools/{name}", post(invoke_tool))
}

#[tracing::instrument(level = "debug", skip_all)]
async fn list_tools(Extension(state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    let tools: Vec<serde_json::Value> = state
        .tools
        .values()
        .map(|tool| ca_tools::to_tool_descriptor(tool.as_ref()))
        .collect();
    Json(json!({ "tools": tools }))
}

#[tracing::instrument(level = "info", skip_all, fields(tool = %name))]
async fn invoke_tool(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let Some(tool) = state.tool(&name) else {
        return error_response(StatusCode::NOT_FOUND, "unknown_tool", format!("unknown tool: {name}"));
    };

    let arguments = match parse_arguments(&body) {
        Ok(v) => v,
        Err(message) => {
            return error_response(StatusCode::BAD_REQUEST, "invalid_json", message);
        }
    };

    match tool.execute(arguments).await {
        Ok(result) => Json(json!({ "status": "ok", "result": result })).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(error_code = e.code(), error = %e, "tool execution failed");
            } else {
                tracing::warn!(error_code = e.code(), error = %e, "tool call rejected");
            }
            error_response(status, e.code(), e.to_string())
        }
    }
}

/// Empty body means no arguments.
fn parse_arguments(body: &[u8]) -> Result<serde_json::Value, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| format!("request body is not valid json: {e}"))?;
    if !value.is_object() {
        return Err("request body must be a json object".to_string());
    }
    Ok(value)
}

fn status_for(error: &ToolError) -> StatusCode {
    match error {
        ToolError::InvalidArguments(_) | ToolError::Csv(_) => StatusCode::BAD_REQUEST,
        ToolError::NotFound(_) => StatusCode::NOT_FOUND,
        ToolError::ExecutionFailed(_) | ToolError::Render(_) | ToolError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "status": "error",
            "error": message.into(),
            "error_code": code,
        })),
    )
        .into_response()
}
