//! nbsup - supervise notebook interpreter processes.

mod check;
mod launch;
mod report;
mod start;

use clap::{Parser, Subcommand};
use nb_protocol::config_models::DEFAULT_READY_MARKER;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nbsup")]
#[command(about = "Launch and supervise notebook interpreter processes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a command and wait until it prints its ready marker
    Launch {
        /// Seconds to wait for the ready marker
        #[arg(short, long, default_value = "60")]
        timeout: u64,

        /// Output line content that signals readiness
        #[arg(long, default_value = DEFAULT_READY_MARKER)]
        ready_marker: String,

        /// Working directory of the process
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Extra environment variable (KEY=VALUE), repeatable
        #[arg(short, long = "env", value_parser = launch::parse_env)]
        env: Vec<(String, String)>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,

        /// Program and arguments, after `--`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Start a configured interpreter, then stop it again
    Start {
        /// Interpreter name from `.notebook/interpreters/`
        name: String,

        /// Project root containing `.notebook/`
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// Validate the configuration and resolve interpreter commands
    Check {
        /// Project root containing `.notebook/`
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.command {
        Commands::Launch {
            timeout,
            ready_marker,
            cwd,
            env,
            json,
            command,
        } => {
            let options = launch::LaunchOptions {
                timeout_secs: timeout,
                ready_marker,
                cwd,
                env,
                json,
            };
            launch::execute(command, options).await?
        }
        Commands::Start { name, root } => start::execute(&name, &root).await?,
        Commands::Check { root } => check::execute(&root).await?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
