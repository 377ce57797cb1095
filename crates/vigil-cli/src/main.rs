mod client;
mod commands;
mod daemon_launcher;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Vigil CLI - Control the Vigil monitoring daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the Telegram credentials used for delivery
    Init {
        /// Overwrite existing credentials
        #[arg(long)]
        force: bool,
    },
    /// Launch the daemon if needed and begin tracking
    Start,
    /// Stop tracking, closing the current session
    Stop,
    /// Show the tracker status
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Deliver pending reports now
    Flush,
    /// Look for a gap in the daemon's heartbeat
    Check,
    /// Periodic entry point: ensure tracking, check for gaps, then flush
    Sync,
    /// List reports waiting in the outbox
    Pending {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => commands::init(force),
        Commands::Start => commands::start().await,
        Commands::Stop => commands::stop().await,
        Commands::Status { json } => commands::status(json).await,
        Commands::Flush => commands::flush().await,
        Commands::Check => commands::check().await,
        Commands::Sync => commands::sync().await,
        Commands::Pending { json } => commands::pending(json),
    }
}
