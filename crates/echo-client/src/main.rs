use std::sync::Arc;

use echo_client::api::HttpSongApi;
use echo_client::app::App;
use echo_client::core::{ClientCore, CoreEvent};
use echo_client::realtime::SocketIoConnector;
use echo_client::scanner::ExternalScanner;
use echo_proto::address::ConnectionDirectory;
use echo_proto::config::Config;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load().unwrap_or_default();

    let log_path = config.paths.log_file.clone();
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP and websocket internals.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "debug,hyper_util=warn,reqwest=warn,hyper=warn,tungstenite=warn,tokio_tungstenite=warn"
            .to_string()
    });
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("echo log: {}", log_path.display());

    tracing::info!("echo starting…");

    // ── Server address ───────────────────────────────────────────────────────
    let directory = ConnectionDirectory::load(
        config.paths.server_state_file.clone(),
        &config.server.default_address,
        config.server.default_port,
    );
    tracing::info!("server endpoint {}", directory.endpoint());

    // ── Core event queue (tasks → ClientCore) ────────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<CoreEvent>(1024);

    let core = ClientCore::new(
        directory,
        Arc::new(HttpSongApi::new()),
        Arc::new(SocketIoConnector),
        Arc::new(ExternalScanner::from_config(&config.scanner)),
        event_tx,
        config.ui.musician_mode,
    );

    // ── Run TUI ──────────────────────────────────────────────────────────────
    App::new(core).run(event_rx).await
}
