//! Command-line flags

use clap::Parser;
use std::path::PathBuf;
use task_tracker::OperationKind;

/// Wait for a control-plane operation to reach a terminal state.
#[derive(Debug, Parser)]
#[command(name = "operation-watch", version)]
pub struct Args {
    /// Operation id returned by the control plane
    #[arg(long = "operation", value_name = "ID")]
    pub operation_id: String,

    /// Lifecycle step of the operation; selects its deadline (create, update, delete)
    #[arg(long, default_value = "update")]
    pub kind: OperationKind,

    /// Hold this resource lock while waiting
    #[arg(long, value_name = "KEY")]
    pub lock_key: Option<String>,

    /// Config file (defaults to operation-watch.toml)
    #[arg(long, env = "CONFIG_PATH", value_name = "PATH")]
    pub config: Option<String>,

    /// Write Prometheus text exposition here when the wait ends
    #[arg(long, value_name = "PATH")]
    pub metrics_file: Option<PathBuf>,
}
