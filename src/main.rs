//! Terminal front end for the door station panel.
//!
//! Usage:
//!   cargo run --bin doorstation-panel -- --url http://10.0.0.60:8080
//!
//! Starts a sync session against the station and prints every relay
//! change and connection transition until Ctrl+C.

use chrono::Local;
use clap::Parser;
use doorstation_panel::config::PanelConfig;
use doorstation_panel::session::PanelSession;
use doorstation_panel::state::ConnectionState;
use log::{error, info};
use tokio::signal;

#[derive(Parser)]
#[command(name = "doorstation-panel")]
#[command(about = "Live status panel for the door station")]
struct Cli {
    /// Base URL of the door station's web server
    #[arg(long, env = "DOORSTATION_URL")]
    url: Option<String>,

    /// Override the status poll interval
    #[arg(long)]
    poll_interval_ms: Option<u64>,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    doorstation_panel::config::load_dotenv();
    init_logger();

    let cli = Cli::parse();

    let mut config = PanelConfig::from_env();
    if let Some(url) = cli.url {
        config.device.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(interval) = cli.poll_interval_ms {
        config.poll.interval_ms = interval;
    }

    info!("Starting door station panel");
    info!("  Device URL: {}", config.device.base_url);
    info!("  Poll interval: {}ms", config.poll.interval_ms);
    info!("  Staleness threshold: {}ms", config.liveness.staleness_threshold_ms);

    let mut session = match PanelSession::start(config) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to start session: {}", e);
            std::process::exit(1);
        }
    };

    // Print relay changes and connection transitions as they land
    let mut relays = session.relay_states();
    let mut connection = session.connection();
    let render_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = relays.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let line = relays
                        .borrow_and_update()
                        .iter()
                        .map(|(id, state)| format!("{}={}", id, state))
                        .collect::<Vec<_>>()
                        .join(" ");
                    println!("{} {}", Local::now().format("%H:%M:%S"), line);
                }
                changed = connection.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *connection.borrow_and_update();
                    let word = match state {
                        ConnectionState::Connected => "connected",
                        ConnectionState::Disconnected => "disconnected",
                    };
                    println!("{} device {}", Local::now().format("%H:%M:%S"), word);
                }
            }
        }
    });

    info!("Panel is running, press Ctrl+C to exit");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    session.shutdown().await;
    render_task.abort();

    info!("Door station panel stopped");
}
