use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

use cli_template::{commands, config, output};

#[derive(Parser)]
#[command(
    name = "cli-template",
    about = "Template command-line tool with health, echo and status commands",
    version,
    long_about = None
)]
struct Cli {
    /// Config file with KEY = value defaults (environment wins)
    #[arg(long, global = true, env = "CLI_TEMPLATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show application status
    Status {
        /// Record this execution in the database
        #[arg(long)]
        save_db: bool,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Echo text with transformations
    Echo {
        /// Text to echo
        text: String,

        /// Also return the reversed text
        #[arg(long)]
        reverse: bool,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Health check
    Health,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout is reserved for command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        println!();
        return ExitCode::FAILURE;
    };

    match run(command, cli.config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", output::error_text(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config_file: Option<PathBuf>) -> Result<()> {
    match command {
        Commands::Status { save_db, json } => {
            let file = config::config_path(config_file);
            let sources = config::ConfigSources::from_process(&file);
            let resolved = config::ResolvedConfig::resolve(&sources);
            tracing::info!(service = %resolved.service_name, save_db, "Reporting status");

            let report = commands::status(&resolved, save_db).await;
            if json {
                println!("{}", output::json(&report)?);
            } else {
                println!("{}", output::status_text(&report));
            }
        }
        Commands::Echo {
            text,
            reverse,
            json,
        } => {
            let result = commands::echo(&text, reverse);
            if json {
                println!("{}", output::json(&result)?);
            } else {
                println!("{}", output::echo_text(&result));
            }
        }
        Commands::Health => {
            println!("{}", commands::health());
        }
    }

    Ok(())
}
