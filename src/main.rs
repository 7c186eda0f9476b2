//! pomodash - Pomodoro interval timer
//!
//! Cycles through focused work and breaks:
//! - 25 minutes of focused work
//! - 5 minutes of short break
//! - 15 minutes of long break after 4 focus sessions

use anyhow::Result;
use clap::{CommandFactory, Parser};

use pomodash::cli::{Cli, Commands, Display, IpcClient};
use pomodash::daemon::{self, DaemonOptions};
use pomodash::types::IpcResponse;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    let Some(command) = cli.command else {
        // No command provided, show help
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Daemon { settings } => {
            let mut options = DaemonOptions::from_data_dir()?;
            if let Some(path) = cli.socket {
                options = options.with_socket_path(path);
            }
            if let Some(path) = settings {
                options = options.with_settings_path(path);
            }
            daemon::run(options).await?;
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
        }
        Commands::Status { compact } => {
            let response = client(cli.socket)?.status().await?;
            if compact {
                Display::show_compact(&response);
            } else {
                Display::show_status(&response);
            }
        }
        command => {
            let client = client(cli.socket)?;
            let response = send(&client, command).await?;
            Display::show_result(&response);
        }
    }

    Ok(())
}

/// Builds a client for the given socket, or the default one.
fn client(socket: Option<std::path::PathBuf>) -> Result<IpcClient> {
    match socket {
        Some(path) => Ok(IpcClient::with_socket_path(path)),
        None => IpcClient::new(),
    }
}

/// Sends an intent command to the daemon.
async fn send(client: &IpcClient, command: Commands) -> Result<IpcResponse> {
    match command {
        Commands::Toggle => client.toggle().await,
        Commands::Reset => client.reset().await,
        Commands::Skip => client.skip().await,
        Commands::Speed { multiplier } => client.speed(multiplier).await,
        Commands::Mode { mode } => client.mode(mode.to_mode()).await,
        Commands::Cycle { count } => client.cycle(count).await,
        Commands::Config(args) => client.configure(args.to_patch()).await,
        Commands::AutoAdvance { state } => client.auto_advance(state.is_on()).await,
        Commands::Status { .. } => client.status().await,
        Commands::Daemon { .. } | Commands::Completions { .. } => {
            anyhow::bail!("このコマンドはデーモンに送信できません")
        }
    }
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
