//! schemagent CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write the default config file
//! - `chat`: Interactive or single-message chat
//! - `prompt`: Print the assembled system prompt
//! - `schemas`: List registered shapes and the response union

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "schemagent",
    about = "schemagent: schema-validated LLM agent orchestration",
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
    /// Initialize the configuration file
    Onboard,

    /// Chat with the agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Run a selected tool within the turn (overrides `agent.tool_dispatch`)
        #[arg(long)]
        execute_tools: bool,

        /// Run the observation + plan step before each reply (overrides `agent.reasoning`)
        #[arg(long)]
        reasoning: bool,
    },

    /// Print the system prompt the next turn would send
    Prompt,

    /// List registered shapes
    Schemas {
        /// Also print each shape's JSON Schema
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat {
            message,
            execute_tools,
            reasoning,
        } => commands::chat::run(message, execute_tools, reasoning).await?,
        Commands::Prompt => commands::prompt::run().await?,
        Commands::Schemas { json } => commands::schemas::run(json).await?,
    }

    Ok(())
}
