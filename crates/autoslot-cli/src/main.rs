use clap::{Parser, Subcommand};

mod commands;
mod offline;

#[derive(Parser)]
#[command(name = "autoslot", version, about = "Place tasks into free calendar time")]
struct Cli {
    /// Use a local file-backed calendar instead of Google Calendar
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Place queued tasks and create their calendar events
    Plan {
        /// Show the placement without creating events
        #[arg(long)]
        dry_run: bool,
    },
    /// Run one full cycle: reconcile, place, upload
    Sync,
    /// Pull calendar edits back into tasks
    Reconcile,
    /// Delete all task events and return the tasks to the queue
    Unschedule,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    // stdout carries command output, logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let offline = cli.offline;
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action),
        Commands::Plan { dry_run } => commands::plan::run(offline, dry_run),
        Commands::Sync => commands::sync::run(offline),
        Commands::Reconcile => commands::plan::reconcile(offline),
        Commands::Unschedule => commands::plan::unschedule(offline),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
