//! Airhaul CLI - collect images, charts and files for air-gapped clusters

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

use airhaul_store::{DEFAULT_REGISTRY, ShutdownTrigger, StoreConfig, shutdown_channel};

#[derive(Parser)]
#[command(name = "airhaul")]
#[command(version)]
#[command(about = "Collect container images, charts and files for air-gapped clusters", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the local content store
    Store {
        /// Directory holding the store
        #[arg(short = 's', long, env = "AIRHAUL_STORE_DIR", default_value = "store", global = true)]
        store_dir: PathBuf,

        /// Address the store's content is served on
        #[arg(long, env = "AIRHAUL_STORE_REGISTRY", default_value = DEFAULT_REGISTRY, global = true)]
        store_registry: String,

        #[command(subcommand)]
        command: StoreCommand,
    },
}

#[derive(Subcommand)]
enum StoreCommand {
    /// Replace the store's content with what content files declare
    Sync {
        /// Path to content files
        #[arg(short = 'f', long = "files", required = true, value_delimiter = ',')]
        files: Vec<PathBuf>,
    },

    /// Copy every stored reference to a remote registry
    Copy {
        /// Destination registry (host[:port])
        registry: String,

        /// Username when copying to an authenticated remote registry
        #[arg(short = 'u', long, env = "AIRHAUL_USERNAME")]
        username: Option<String>,

        /// Password when copying to an authenticated remote registry
        #[arg(short = 'p', long, env = "AIRHAUL_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Allow insecure connections when copying to a remote registry
        #[arg(long)]
        insecure: bool,

        /// Allow plain http connections when copying to a remote registry
        #[arg(long)]
        plain_http: bool,
    },

    /// Write one stored reference's content to disk
    Extract {
        /// Reference to extract, as listed by `store info`
        reference: String,

        /// Directory to save contents to
        #[arg(long = "dir", default_value = ".")]
        dir: PathBuf,
    },

    /// List stored references
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Logs go to stderr; `--debug` wins over `RUST_LOG`
fn initialize_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Fire `trigger` on the first Ctrl-C
fn cancel_on_interrupt(trigger: ShutdownTrigger) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping");
            trigger.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    miette::set_panic_hook();

    let cli = Cli::parse();
    initialize_tracing(cli.debug);

    let (trigger, shutdown) = shutdown_channel();
    cancel_on_interrupt(trigger);

    let result = match cli.command {
        Commands::Store {
            store_dir,
            store_registry,
            command,
        } => {
            let config = StoreConfig::new(store_dir).with_registry(store_registry);
            match command {
                StoreCommand::Sync { files } => commands::sync::run(config, &files, &shutdown).await,
                StoreCommand::Copy {
                    registry,
                    username,
                    password,
                    insecure,
                    plain_http,
                } => {
                    let options = airhaul_store::CopyOptions {
                        username,
                        password,
                        insecure,
                        plain_http,
                    };
                    commands::copy::run(config, &registry, &options, &shutdown).await
                }
                StoreCommand::Extract { reference, dir } => {
                    commands::extract::run(config, &reference, &dir, &shutdown).await
                }
                StoreCommand::Info { json } => commands::info::run(config, json).await,
            }
        }
    };

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
