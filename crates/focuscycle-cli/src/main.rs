use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod feedback;

#[derive(Parser)]
#[command(name = "focuscycle-cli", version, about = "FocusCycle CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview the phase sequence for a task estimate
    Phases(commands::phases::PhasesArgs),
    /// Run a cycle in this terminal
    Run(commands::run::RunArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Persisted phase sessions
    Sessions {
        #[command(subcommand)]
        action: commands::sessions::SessionsAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FOCUSCYCLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Phases(args) => commands::phases::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Sessions { action } => commands::sessions::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
