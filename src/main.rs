//! configdrive-rs - mount the config drive and hand off to the metadata tool
//!
//! Meant to be started from init (early) and from udev for every network
//! interface (run).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use configdrive_rs::config::ConfigLoader;
use configdrive_rs::config::loader::DEFAULT_CONFIG_PATH;
use configdrive_rs::{ConfigDriveError, System, Variant, detect, run_variant};

#[derive(Parser, Debug)]
#[command(name = "configdrive-rs")]
#[command(author, version, about = "Mount the config drive and hand off to the metadata tool", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Main configuration file; drop-ins are read from config.d next to it
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Early boot: mount the drive and exec the tool without networking
    #[command(disable_help_flag = true)]
    Early {
        /// Arguments forwarded to the downstream tool
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Mount the drive and run the tool for this invocation
    #[command(disable_help_flag = true)]
    Run {
        /// Arguments forwarded to the downstream tool
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Probe for the drive and print a JSON report, without mounting
    Detect,
}

fn init_logging(verbosity: u8, quiet: bool) {
    let level = match (quiet, verbosity) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };

    // stdout belongs to the detect report and the downstream tool
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

#[tokio::main]
async fn main() -> Result<ExitCode, ConfigDriveError> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = ConfigLoader::new().with_path(&cli.config).load().await?;
    let system = System::from_config(config);

    let status = match cli.command {
        Commands::Early { args } => run_variant(Variant::Early, &system, &args).await?,
        Commands::Run { args } => run_variant(Variant::General, &system, &args).await?,
        Commands::Detect => {
            let report = detect(&system).await?;
            info!("Config drive found: {}", report.found);
            println!("{}", serde_json::to_string_pretty(&report)?);
            0
        }
    };

    Ok(ExitCode::from(status))
}
