//! toolcred CLI library
//!
//! Exposes the CLI's configuration and snapshot handling for testing.

pub mod config;
pub mod snapshot;

pub use config::{CliConfig, load_config, load_config_from};
pub use snapshot::{Snapshot, SweepOutcome, UserKind, UserRef, run_status, run_sweep};
