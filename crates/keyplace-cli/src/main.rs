mod commands;
mod config;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{DecodeArgs, PlaceArgs, RenderArgs};
use crate::error::{CliError, ErrorCode};

#[derive(Parser)]
#[command(name = "keyplace", version, about, long_about = None)]
struct Cli {
    /// YAML settings providing render/placement defaults
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a layout and write its keys as JSON
    Decode(DecodeArgs),
    /// Render a layout as an SVG diagram
    Render(RenderArgs),
    /// Move KiCad footprints to the decoded key positions
    Place(PlaceArgs),
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = config::load(cli.config.as_deref())
        .map_err(|e| CliError::input(format!("{e:#}")))?;

    match cli.command {
        Command::Decode(args) => commands::run_decode(args),
        Command::Render(args) => commands::run_render(args, &settings),
        Command::Place(args) => commands::run_place(args, &settings).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(ErrorCode::Usage as u8),
            };
        }
    };

    init_tracing(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_status())
        }
    }
}
