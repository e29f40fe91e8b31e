//! Command-line tool for one-shot door station operations.
//!
//! Usage:
//!   cargo run --bin doorstation-ctl -- status
//!   cargo run --bin doorstation-ctl -- config show
//!   cargo run --bin doorstation-ctl -- config set settings.json
//!   cargo run --bin doorstation-ctl -- doorbell
//!   cargo run --bin doorstation-ctl -- factory-reset --yes
//!
//! Reads and writes go through the same web API the panel session uses.

use clap::{Parser, Subcommand};
use doorstation_panel::client::DeviceClient;
use doorstation_panel::config::DeviceEndpointConfig;
use doorstation_panel::error::Result;
use doorstation_panel::protocol::DeviceSettings;
use doorstation_panel::state::RelayState;
use std::path::PathBuf;

/// Default door station URL, matching the firmware's static address.
const DEFAULT_URL: &str = "http://10.0.0.60:8080";

#[derive(Parser)]
#[command(name = "doorstation-ctl")]
#[command(about = "One-shot commands against the door station web API")]
struct Cli {
    /// Base URL of the door station's web server
    #[arg(long, env = "DOORSTATION_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show relay states and system status
    Status,
    /// Show the bare relay map
    Relays,
    /// Read or write the station configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Trigger the doorbell
    Doorbell,
    /// Erase the stored configuration and reboot the station
    FactoryReset {
        /// Confirm the reset; without this flag nothing is sent
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration (passwords arrive masked)
    Show,
    /// Upload configuration from a JSON file
    Set {
        /// Path to a JSON file with the fields to change
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file before anything else
    doorstation_panel::config::load_dotenv();

    let cli = Cli::parse();
    let client = DeviceClient::new(&DeviceEndpointConfig {
        base_url: cli.url,
        http_timeout_ms: cli.timeout_ms,
    })?;

    match cli.command {
        Commands::Status => {
            let status = client.fetch_status().await?;
            println!("door:  {}", RelayState::from(status.relays.door));
            println!("light: {}", RelayState::from(status.relays.light));
            if let Some(system) = status.system {
                println!("system: {}", system);
            }
        }
        Commands::Relays => {
            let relays = client.fetch_relays().await?;
            println!("{}", serde_json::to_string_pretty(&relays)?);
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let settings = client.fetch_settings().await?;
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
            ConfigAction::Set { file } => {
                let raw = std::fs::read_to_string(&file)?;
                let settings: DeviceSettings = serde_json::from_str(&raw)?;
                let ack = client.save_settings(&settings).await?;
                if ack.is_success() {
                    println!("Configuration saved");
                } else {
                    eprintln!(
                        "Device rejected configuration: {}",
                        ack.status.as_deref().unwrap_or("no status")
                    );
                    std::process::exit(1);
                }
            }
        },
        Commands::Doorbell => {
            let ack = client.press_doorbell().await?;
            println!("{}", ack.message.or(ack.status).unwrap_or_default());
        }
        Commands::FactoryReset { yes } => {
            if !yes {
                eprintln!("Refusing to factory-reset without --yes");
                std::process::exit(1);
            }
            let ack = client.factory_reset().await?;
            println!(
                "{}",
                ack.message.unwrap_or_else(|| "Factory reset".to_string())
            );
        }
    }

    Ok(())
}
