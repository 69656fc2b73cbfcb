use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use jira_mcp_bridge::config::{ServerConfig, LOG_FILTER_VAR};
use jira_mcp_bridge::credentials::CredentialResolver;
use jira_mcp_bridge::jira::HttpConnector;
use jira_mcp_bridge::mcp::{MCPServer, ServerContext, StdioTransport, SERVER_NAME, SERVER_VERSION};

/// MCP server exposing Jira Cloud issue operations over stdio
#[derive(Debug, Parser)]
#[command(name = "jira-mcp-bridge", version, about)]
struct Cli {
    /// Also write logs to a daily rotated file in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Resolve credentials, report which are missing, and exit
    #[arg(long)]
    check: bool,
}

fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    let filter = || {
        std::env::var(LOG_FILTER_VAR)
            .ok()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    };

    // stdout carries the protocol, so console logs go to stderr
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter());

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "jira-mcp-bridge.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(stderr_layer).init();
            None
        }
    }
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Cannot listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", SERVER_NAME, e);
            return ExitCode::FAILURE;
        }
    };
    if cli.log_dir.is_some() {
        config.log_dir = cli.log_dir;
    }

    let _guard = init_tracing(config.log_dir.as_ref());
    info!("{} v{} starting", SERVER_NAME, SERVER_VERSION);

    let resolver = CredentialResolver::with_defaults(&config.keyring_service);

    if cli.check {
        return match resolver.resolve() {
            Ok(credentials) => {
                info!("Credentials found for {} ({})", credentials.base_url, credentials.email);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    let connector = HttpConnector::new(config.request_timeout);
    let server = MCPServer::new(ServerContext::new(config, resolver, Box::new(connector)));
    let mut transport = StdioTransport::stdio();

    tokio::select! {
        result = server.serve(&mut transport) => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
        _ = terminate_signal() => {
            info!("Terminated, shutting down");
        }
    }

    ExitCode::SUCCESS
}
