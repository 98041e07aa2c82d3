//! BRIT CLI
//!
//! Payer and Matcher sides of the BRIT fee exchange from the command line.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod ui;

#[derive(Parser)]
#[command(name = "brit")]
#[command(about = "BRIT fee-exchange protocol tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Data directory (can also be set via BRIT_DATA_DIR env var)
    #[arg(long, global = true, env = "BRIT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Config file (defaults to brit.json in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Where the wallet seed comes from.
#[derive(Args, Clone, Debug)]
#[group(required = true, multiple = false)]
pub struct SeedArgs {
    /// Wallet seed as hex
    #[arg(long)]
    seed: Option<String>,

    /// File holding the wallet seed as hex
    #[arg(long)]
    seed_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a Matcher key pair
    Keygen {
        /// User id stored with the key
        #[arg(short, long, default_value = "brit-matcher")]
        user_id: String,

        /// Output directory for matcher.pub.asc and matcher.sec.asc
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Protect the secret key with a passphrase (prompted)
        #[arg(long)]
        protect: bool,

        /// Overwrite existing key files
        #[arg(long)]
        force: bool,
    },

    /// Derive the wallet identity from a seed
    Identity {
        #[command(flatten)]
        seed: SeedArgs,
    },

    /// Build and encrypt a Payer request to a file
    Request {
        #[command(flatten)]
        seed: SeedArgs,

        /// Matcher public key ring
        #[arg(short, long)]
        key: PathBuf,

        /// Output file for the encrypted request
        #[arg(short, long)]
        out: PathBuf,

        /// Date of the wallet's first transaction (RFC 3339)
        #[arg(long)]
        first_tx: Option<String>,
    },

    /// Matcher: answer an encrypted request file
    Respond {
        /// Matcher secret key ring
        #[arg(short, long)]
        secret_key: PathBuf,

        /// Address pool, one address per line
        #[arg(short, long)]
        pool: PathBuf,

        /// Encrypted request file
        #[arg(short, long)]
        request: PathBuf,

        /// Output file for the encrypted response
        #[arg(short, long)]
        out: PathBuf,

        /// Secret key passphrase
        #[arg(long, env = "BRIT_PASSPHRASE", hide_env_values = true, default_value = "")]
        passphrase: String,
    },

    /// Payer: decrypt a response file and store it
    Accept {
        #[command(flatten)]
        seed: SeedArgs,

        /// Encrypted response file
        #[arg(short, long)]
        response: PathBuf,
    },

    /// Payer: exchange with a Matcher over HTTP and store the response
    Exchange {
        #[command(flatten)]
        seed: SeedArgs,

        /// Matcher public key ring
        #[arg(short, long)]
        key: PathBuf,

        /// Matcher URL (overrides the config file)
        #[arg(long)]
        url: Option<String>,

        /// Date of the wallet's first transaction (RFC 3339)
        #[arg(long)]
        first_tx: Option<String>,
    },

    /// Evaluate the fee schedule
    Fees {
        #[command(flatten)]
        seed: SeedArgs,

        /// Wallet sends since the last fee payment
        #[arg(long, default_value = "0")]
        sends: u64,

        /// Record the due fee as sent
        #[arg(long)]
        commit: bool,
    },

    /// Show the stored slots
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget the stored Matcher response and fee schedule
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "brit_cli=debug,brit_lib=debug"
    } else {
        "brit_cli=info,brit_lib=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Setup data directory
    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("brit")
    });
    let config = config::CliConfig::load(&data_dir, cli.config.as_deref())?;

    // Dispatch commands
    match cli.command {
        Commands::Keygen {
            user_id,
            out,
            protect,
            force,
        } => {
            let out = out.unwrap_or_else(|| data_dir.join("keys"));
            commands::keygen::run(&out, &user_id, protect, force, cli.verbose)?;
        }
        Commands::Identity { seed } => {
            commands::identity::run(&seed)?;
        }
        Commands::Request {
            seed,
            key,
            out,
            first_tx,
        } => {
            commands::request::run(&data_dir, &config, &seed, &key, &out, first_tx.as_deref())?;
        }
        Commands::Respond {
            secret_key,
            pool,
            request,
            out,
            passphrase,
        } => {
            commands::respond::run(
                &data_dir,
                &config,
                &secret_key,
                &pool,
                &request,
                &out,
                &passphrase,
            )?;
        }
        Commands::Accept { seed, response } => {
            commands::accept::run(&data_dir, &config, &seed, &response)?;
        }
        Commands::Exchange {
            seed,
            key,
            url,
            first_tx,
        } => {
            commands::exchange::run(
                &data_dir,
                &config,
                &seed,
                &key,
                url,
                first_tx.as_deref(),
            )?;
        }
        Commands::Fees {
            seed,
            sends,
            commit,
        } => {
            commands::fees::run(&data_dir, &config, &seed, sends, commit)?;
        }
        Commands::Status { json } => {
            commands::status::run(&data_dir, json)?;
        }
        Commands::Reset { yes } => {
            commands::status::reset(&data_dir, yes)?;
        }
    }

    Ok(())
}
