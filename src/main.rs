//! dashtimer - persistent countdown timers for dashboard widgets
//!
//! `dashtimer daemon` keeps time and raises alarms; every other subcommand
//! is a thin client that talks to it over a Unix socket.

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use dashtimer::cli::{Cli, Commands, Display, IpcClient};
use dashtimer::daemon;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(&cli);

    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins when set; otherwise the daemon logs at `info` and
/// clients at `warn`, one level lower with `--verbose`.
fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let is_daemon = matches!(cli.command, Some(Commands::Daemon(_)));
    let default_level = match (is_daemon, cli.verbose) {
        (_, true) => "debug",
        (true, false) => "info",
        (false, false) => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn client(socket: Option<PathBuf>) -> Result<IpcClient> {
    match socket {
        Some(path) => Ok(IpcClient::with_socket_path(path)),
        None => IpcClient::new(),
    }
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let socket = cli.socket;

    match cli.command {
        Some(Commands::Daemon(args)) => {
            let config = args.into_config(socket)?;
            daemon::run(config).await?;
        }
        Some(Commands::Create(args)) => {
            let response = client(socket)?.create(&args).await?;
            Display::show_result(&response);
        }
        Some(Commands::Start { id }) => {
            let response = client(socket)?.start(&id).await?;
            Display::show_result(&response);
        }
        Some(Commands::Pause { id }) => {
            let response = client(socket)?.pause(&id).await?;
            Display::show_result(&response);
        }
        Some(Commands::Reset { id, duration }) => {
            let response = client(socket)?.reset(&id, duration).await?;
            Display::show_result(&response);
        }
        Some(Commands::Label { id, text }) => {
            let response = client(socket)?.label(&id, &text).await?;
            Display::show_result(&response);
        }
        Some(Commands::Delete { id }) => {
            let response = client(socket)?.delete(&id).await?;
            Display::show_result(&response);
        }
        Some(Commands::Status { id }) => {
            let response = client(socket)?.status(id.as_deref()).await?;
            Display::show_status(&response);
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
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
