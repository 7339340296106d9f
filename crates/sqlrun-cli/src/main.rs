mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sqlrun",
    version,
    about = "Run ordered pipelines of SQL files against BigQuery"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline of SQL files
    Run {
        /// Path to the settings file
        #[arg(short = 'c', long, default_value = commands::init::DEFAULT_SETTINGS_FILENAME)]
        config: PathBuf,
        /// Directory containing .sql files to execute (overrides settings)
        #[arg(short = 'r', long)]
        directory: Option<String>,
        /// Target project ID (overrides settings)
        #[arg(short = 'p', long)]
        project: Option<String>,
        /// Default dataset for unqualified table references (overrides settings)
        #[arg(short = 'd', long)]
        dataset: Option<String>,
        /// Data processing location, e.g. australia-southeast1 (overrides settings)
        #[arg(short = 'l', long)]
        location: Option<String>,
        /// Service account email to impersonate for engine calls
        #[arg(long)]
        impersonate_service_account: Option<String>,
        /// Dry run: validate queries without executing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Write a default settings file in the current directory
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run {
            config,
            directory,
            project,
            dataset,
            location,
            impersonate_service_account,
            dry_run,
        } => {
            commands::run::execute(commands::run::RunArgs {
                config,
                directory,
                project,
                dataset,
                location,
                impersonate_service_account,
                dry_run,
            })
            .await
        }
        Commands::Init { force } => commands::init::execute(force),
    }
}
