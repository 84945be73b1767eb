//! LoopClaw CLI, the main entry point.
//!
//! Commands:
//! - `chat`    Interactive chat or single-message mode
//! - `serve`   Start the HTTP gateway
//! - `tools`   Print the tool catalog
//! - `doctor`  Diagnose config, backend and tools
//! - `init`    Write the default config and create the workspace

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "loopclaw",
    about = "LoopClaw, a tool-calling agent for locally hosted models",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the tool catalog
    Tools {
        /// Print the JSON definitions sent to the model
        #[arg(long)]
        json: bool,
    },

    /// Diagnose config, backend and tools
    Doctor,

    /// Write the default config and create the workspace
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat { message } => commands::chat::run(message).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Tools { json } => commands::tools::run(json)?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Init { force } => commands::init::run(force)?,
    }

    Ok(())
}
