//! jlcpart - fetch JLCPCB/LCSC parts as KiCad footprints and symbols.

mod commands;
mod error;
mod host;

use clap::{Parser, Subcommand};
use jlcpart::config::ConfigFile;
use jlcpart::logging::{self, LoggingConfig};
use tracing::{debug, warn};

use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "jlcpart", version = jlcpart::VERSION, about)]
struct Cli {
    /// Also log to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download a part's footprint (and symbol in project mode)
    Fetch(FetchArgs),

    /// Show interpreter and generation library versions
    Status,

    /// Check for generation library updates
    Update {
        /// Upgrade without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Install the generation library if missing
    Install {
        /// Install without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// View or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let command = match cli.command {
        Commands::Config(command) => return commands::config::run(command),
        command => command,
    };

    let config = ConfigFile::load()?;
    let _guard = match logging::init(&LoggingConfig::from(&config.logging).with_stderr(cli.verbose)) {
        Ok(guard) => {
            debug!(log_file = %guard.log_file().display(), "Logging initialized");
            Some(guard)
        }
        Err(e) => {
            eprintln!("warning: logging disabled: {}", e);
            None
        }
    };

    let result = match command {
        Commands::Fetch(args) => commands::fetch::run(args, config),
        Commands::Status => commands::status::run(config),
        Commands::Update { yes } => commands::update::run(yes, config),
        Commands::Install { yes } => commands::install::run(yes, config),
        Commands::Config(_) => Ok(()),
    };
    if let Err(e) = &result {
        warn!(error = %e, "Command failed");
    }
    result
}
