//! toolcred CLI
//!
//! Runs tool info and credential sweep passes against a JSON snapshot.
//!
//! # Usage
//!
//! ```bash
//! # Show which credentials each tool of an agent needs
//! toolcred status agent/agent1
//!
//! # Preview which credentials of a workflow would be deleted
//! toolcred sweep workflow/wf1 --dry-run
//!
//! # Delete them and write the result back to the snapshot
//! toolcred sweep workflow/wf1
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use toolcred_cli::{Snapshot, SweepOutcome, UserRef, load_config, run_status, run_sweep};

#[derive(Parser)]
#[command(name = "toolcred")]
#[command(about = "Credential status and cleanup for agents and workflows")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Snapshot file to operate on
    #[arg(short, long, global = true)]
    snapshot: Option<PathBuf>,

    /// Namespace of the tool user
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and record tool infos for a tool user
    Status {
        /// Tool user as agent/<name> or workflow/<name>
        user: UserRef,
    },

    /// Delete credentials a tool user no longer needs
    Sweep {
        /// Tool user as agent/<name> or workflow/<name>
        user: UserRef,

        /// Print the plan without deleting anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config()?;

    init_logging(if cli.verbose { "debug" } else { config.log_level.as_str() });
    info!("Loaded configuration from {:?}", config.config_path);

    let snapshot_path = cli.snapshot.unwrap_or(config.snapshot_path);
    let namespace = cli.namespace.unwrap_or(config.default_namespace);
    let mut snapshot = Snapshot::load(&snapshot_path)?;

    match cli.command {
        Commands::Status { user } => {
            let infos = run_status(&mut snapshot, &user, &namespace).await?;
            snapshot.save(&snapshot_path)?;
            println!("{}", serde_json::to_string_pretty(&infos)?);
        }
        Commands::Sweep { user, dry_run } => {
            let outcome = run_sweep(&mut snapshot, &user, &namespace, dry_run).await?;
            if let SweepOutcome::Swept(report) = &outcome {
                info!(deleted = report.deleted.len(), "sweep complete");
                snapshot.save(&snapshot_path)?;
            }
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
