use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stepcase_web::{AppState, ServiceConfig};

#[derive(Parser)]
#[command(name = "stepcase-web")]
#[command(about = "Stepcase - turn recorded UI steps into test cases")]
#[command(version)]
struct Cli {
    /// HTTP listen address
    #[arg(short, long, env = "STEPCASE_LISTEN", default_value = "127.0.0.1:8000")]
    listen: SocketAddr,

    /// Configuration file path (TOML)
    #[arg(short, long, env = "STEPCASE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let cfg = ServiceConfig::load(cli.listen, cli.config.as_deref())?;

    info!("Stepcase v{}", stepcase_common::VERSION);
    info!(
        "Agents: screenshot={} test-cases={} (timeout: {})",
        cfg.agents.screenshot_to_structure,
        cfg.agents.structure_to_test_cases,
        cfg.request_timeout
            .map(|t| format!("{}s", t.as_secs()))
            .unwrap_or_else(|| "none".to_string()),
    );

    let state = AppState::from_config(&cfg)?;
    stepcase_web::serve(cfg.listen, state).await
}
