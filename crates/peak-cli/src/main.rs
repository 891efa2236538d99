use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use peak_application::PeakClient;
use peak_application::conversation::DEFAULT_PAGE_SIZE;
use peak_core::PeakError;
use peak_infrastructure::ConfigService;

mod commands;

const LOG_ENV: &str = "PEAK_LOG";

#[derive(Parser)]
#[command(name = "peak")]
#[command(about = "PeakState CLI - chat with your energy coach", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with phone number and password
    Login {
        phone_number: String,
        #[arg(long, env = "PEAK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        phone_number: String,
        #[arg(long, env = "PEAK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Coach persona (mentor, coach, doctor, zen)
        #[arg(long, default_value = "coach")]
        coach: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Change coach persona or timezone
    Profile {
        #[arg(long)]
        coach: Option<String>,
        #[arg(long)]
        timezone: Option<String>,
    },
    /// List conversations
    Conversations {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,
    },
    /// Delete a conversation
    Delete { conversation_id: String },
    /// Chat with the coach
    Chat {
        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config_service = match cli.config {
        Some(path) => ConfigService::new(path),
        None => ConfigService::default_location()?,
    };
    let config = config_service.load()?;
    tracing::debug!("[Cli] Using API at {}", config.api_base_url);
    let client = PeakClient::connect(config)?;

    let outcome = match cli.command {
        Commands::Login {
            phone_number,
            password,
        } => commands::auth::login(&client, &phone_number, password).await,
        Commands::Register {
            phone_number,
            password,
            coach,
        } => commands::auth::register(&client, &phone_number, password, &coach).await,
        Commands::Logout => commands::auth::logout(&client).await,
        Commands::Whoami => commands::auth::whoami(&client).await,
        Commands::Profile { coach, timezone } => {
            commands::auth::update_profile(&client, coach, timezone).await
        }
        Commands::Conversations { page, page_size } => {
            commands::conversations::list(&client, page, page_size).await
        }
        Commands::Delete { conversation_id } => {
            commands::conversations::delete(&client, &conversation_id).await
        }
        Commands::Chat { conversation } => {
            commands::chat::run(&client, conversation.as_deref()).await
        }
    };

    if let Err(err) = &outcome {
        if let Some(peak) = err.downcast_ref::<PeakError>() {
            if peak.requires_reauthentication() {
                eprintln!(
                    "{}",
                    "Your session has expired. Run `peak login` to sign in again.".yellow()
                );
            }
        }
    }
    outcome
}
