//! BHX Bridge - mirrors a Homag BHX machine log into a process-automation
//! server and forwards program-load requests to the machine.
//!
//! Log appends become typed field events; completed start/end pairs become
//! MES handoff files.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod command;
mod config;
mod error;
mod events;
mod machine;
mod server;
mod watcher;

pub use config::BridgeConfig;
pub use error::Error;

#[derive(Parser)]
#[command(name = "bhxd")]
#[command(about = "BHX Bridge - machine log to automation server")]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the machine log until interrupted
    Run,

    /// Ask the machine to load a program
    Send {
        /// Program name, at most general.tcp_string_length characters
        program: String,
    },

    /// Show configuration and the last log record
    Status,
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = BridgeConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging.level);

    match command {
        Commands::Run => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::run::run(config))?;
        }
        Commands::Send { program } => {
            if !cli::send::run(&config, &program)? {
                std::process::exit(1);
            }
        }
        Commands::Status => {
            let exit_code = cli::status::run(&config)?;
            if exit_code != cli::status::exit_code::OK {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
