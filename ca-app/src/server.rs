//! Company assistant tool server.
//!
//! Builds the enabled tools from config and mounts them behind the HTTP routes.

use crate::config::AppConfig;
use crate::routes;
use anyhow::Result;
use axum::Extension;
use axum::http::HeaderMap;
use axum::http::Request;
use axum::http::StatusCode;
use axum::response::Response;
use ca_tools::{DocGenTool, DocumentGenerator, DocumentsTool, Tool};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub tools: BTreeMap<String, Arc<dyn Tool>>,
    pub generator: Option<Arc<DocumentGenerator>>,
}

impl AppState {
    pub fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }
}

pub fn build_state(cfg: &AppConfig) -> Result<AppState> {
    let mut tools: BTreeMap<String, Arc<dyn Tool>> = BTreeMap::new();
    let mut generator = None;

    if cfg.docgen.enabled {
        let docgen = Arc::new(DocumentGenerator::new(cfg.docgen_settings()?)?);
        tracing::info!(output_dir = %docgen.output_dir().display(), "document generation enabled");
        register(&mut tools, Arc::new(DocGenTool::new(docgen.clone())))?;
        generator = Some(docgen);
    }
    if cfg.documents.enabled {
        let root = cfg.documents_root()?;
        if !root.is_dir() {
            tracing::warn!(root_dir = %root.display(), "documents folder does not exist yet");
        }
        let documents = DocumentsTool::new(&root, cfg.documents.match_cutoff)?;
        register(&mut tools, Arc::new(documents))?;
    }

    Ok(AppState { tools, generator })
}

fn register(tools: &mut BTreeMap<String, Arc<dyn Tool>>, tool: Arc<dyn Tool>) -> Result<()> {
    let name = tool.spec().name;
    if tools.insert(name.clone(), tool).is_some() {
        return Err(anyhow::anyhow!("duplicate tool name: {name}"));
    }
    Ok(())
}

pub async fn doctor(config_path: Option<PathBuf>) -> Result<()> {
    let (cfg, path) = AppConfig::load_with_path(config_path).await?;
    let state = build_state(&cfg)?;
    let docgen_settings = cfg.docgen_settings()?;
    tracing::info!(
        config_path = %path.display(),
        bind_addr = %cfg.bind_addr()?,
        docgen_enabled = cfg.docgen.enabled,
        docgen_output_dir = %docgen_settings.output_dir.display(),
        documents_enabled = cfg.documents.enabled,
        documents_root = %cfg.documents_root()?.display(),
        tools = ?state.tools.keys().collect::<Vec<_>>(),
        "config ok"
    );
    Ok(())
}

pub async fn print_tools(config_path: Option<PathBuf>) -> Result<()> {
    let cfg = AppConfig::load(config_path).await?;
    let state = build_state(&cfg)?;
    let descriptors: Vec<serde_json::Value> = state
        .tools
        .values()
        .map(|tool| ca_tools::to_tool_descriptor(tool.as_ref()))
        .collect();
    println!("{}", serde_json::to_string_pretty(&descriptors)?);
    Ok(())
}

pub async fn cleanup_once(config_path: Option<PathBuf>) -> Result<()> {
    let cfg = AppConfig::load(config_path).await?;
    let generator = DocumentGenerator::new(cfg.docgen_settings()?)?;
    let report = generator.cleanup().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("{}", report.message());
    Ok(())
}

pub fn build_app(state: Arc<AppState>, cfg: &AppConfig) -> axum::Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
                request_id = %request_id_from_headers(request.headers())
            )
        })
        .on_request(|request: &Request<_>, _span: &tracing::Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id_from_headers(request.headers()),
                "http request started"
            );
        })
        .on_response(
            |response: &Response, latency: Duration, _span: &tracing::Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis() as u64,
                    "http request completed"
                );
            },
        )
        .on_failure(
            |error: ServerErrorsFailureClass, latency: Duration, _span: &tracing::Span| {
                tracing::error!(
                    error_class = %error,
                    latency_ms = latency.as_millis() as u64,
                    "http request failed"
                );
            },
        );

    routes::router()
        .layer(Extension(state))
        .layer(GlobalConcurrencyLimitLayer::new(cfg.server.http_max_in_flight))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(cfg.server.http_timeout_seconds),
        ))
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

pub async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    let (cfg, cfg_path) = AppConfig::load_with_path(config_path).await?;
    let addr = cfg.bind_addr()?;
    tracing::info!(config_path = %cfg_path.display(), %addr, "config loaded");

    let state = Arc::new(build_state(&cfg)?);
    if state.tools.is_empty() {
        tracing::warn!("no tools enabled; only health and listing routes will respond");
    }
    let listener = preflight_bind_listener(addr).await?;
    let app = build_app(state.clone(), &cfg);

    let shutdown = CancellationToken::new();
    tracing::info!(%addr, tool_count = state.tools.len(), "company assistant serving");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;
    tracing::info!("http server shutdown completed");

    Ok(())
}

async fn preflight_bind_listener(addr: SocketAddr) -> Result<tokio::net::TcpListener> {
    tracing::info!(%addr, "preflight bind check starting");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("preflight bind failed for {addr}: {e}"))?;
    tracing::info!(%addr, "preflight bind check passed");
    Ok(listener)
}

fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "missing".to_string())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler; falling back to ctrl_c only");
                if let Err(ctrlc_err) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %ctrlc_err, "failed to await ctrl-c signal");
                }
                shutdown.cancel();
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("received ctrl-c; beginning graceful shutdown");
            }
            _ = terminate.recv() => {
                tracing::warn!("received SIGTERM; beginning graceful shutdown");
            }
            _ = shutdown.cancelled() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => tracing::warn!("received ctrl-c; beginning graceful shutdown"),
                Err(e) => tracing::error!(error = %e, "failed to await ctrl-c signal"),
            },
            _ = shutdown.cancelled() => {}
        }
    }
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(tmp: &std::path::Path) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.docgen.output_dir = Some(tmp.join("out").display().to_string());
        cfg.documents.root_dir = tmp.join("policies").display().to_string();
        cfg
    }

    #[test]
    fn build_state_registers_enabled_tools() {
        let tmp = tempfile::tempdir().unwrap();
        let state = build_state(&config_in(tmp.path())).expect("state");
        assert_eq!(
            state.tools.keys().cloned().collect::<Vec<_>>(),
            vec!["document_generation", "documents"]
        );
        assert!(state.generator.is_some());
    }

    #[test]
    fn disabled_sections_are_not_registered() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = config_in(tmp.path());
        cfg.docgen.enabled = false;
        let state = build_state(&cfg).expect("state");
        assert!(state.tool("document_generation").is_none());
        assert!(state.tool("documents").is_some());
        assert!(state.generator.is_none());
    }

    #[test]
    fn request_id_defaults_to_missing() {
        assert_eq!(request_id_from_headers(&HeaderMap::new()), "missing");
    }
}
