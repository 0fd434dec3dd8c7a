//! CLI entry point.
//!
//! Loads `.env`, parses arguments, installs logging and dispatches to a
//! handler. Errors are printed once here and turned into the exit code;
//! Ctrl-C prints a plain notice and exits 130.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;
use voicecast_cli::{Cli, Commands, cancel_on_ctrl_c, exit_code, handlers, report};

#[tokio::main]
async fn main() {
    // Load environment variables before clap reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = dispatch(&cli).await {
        eprintln!("{}", report(&err));
        std::process::exit(exit_code(&err));
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    let Some(command) = &cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Speak(args) => {
            let cancel = cancel_on_ctrl_c();
            handlers::speak::execute(cli, args, &cancel).await
        }
        Commands::Devices => handlers::devices::execute(cli),
    }
}
