//! Company assistant tool server binary.

mod config;
mod routes;
mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Parser)]
#[command(
    name = "company-assistant",
    version,
    about = "Company assistant document tool server"
)]
struct Cli {
    /// Config file (default: ~/.company-assistant/config.toml).
    #[arg(long, global = true, env = "COMPANY_ASSISTANT_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP tool server (default).
    Serve,
    /// Validate config and log the resolved settings.
    Doctor,
    /// Print the enabled tool specs as JSON.
    Tools,
    /// Delete generated documents in the output directory once.
    Cleanup,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => return Err(anyhow::anyhow!("load .env: {e}")),
    }
    init_tracing()?;
    install_panic_hook();

    let cli = Cli::parse();

    let command = if let Some(command) = cli.command {
        command
    } else {
        Command::Serve
    };

    match command {
        Command::Serve => server::serve(cli.config).await,
        Command::Doctor => server::doctor(cli.config).await,
        Command::Tools => server::print_tools(cli.config).await,
        Command::Cleanup => server::cleanup_once(cli.config).await,
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(v) => v,
        Err(_) => EnvFilter::new(
            "info,company_assistant=debug,ca_app=debug,ca_tools=debug,tower_http=info",
        ),
    };
    let log_format = std::env::var("COMPANY_ASSISTANT_LOG_FORMAT")
        .unwrap_or_else(|_| "json".to_string())
        .to_ascii_lowercase();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    match log_format.as_str() {
        "json" => builder
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(true)
            .init(),
        "pretty" => builder.pretty().init(),
        "compact" => builder.compact().init(),
        other => {
            return Err(anyhow::anyhow!(
                "unsupported COMPANY_ASSISTANT_LOG_FORMAT={other:?}; expected one of: json, pretty, compact"
            ));
        }
    }

    tracing::info!(
        log_format = %log_format,
        env_filter = ?std::env::var("RUST_LOG").ok(),
        "tracing initialized"
    );
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_to_string(panic_info.payload());
        tracing::error!(
            panic_location = %location,
            panic_payload = %payload,
            "panic captured"
        );
        default_hook(panic_info);
    }));
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return msg.to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}
