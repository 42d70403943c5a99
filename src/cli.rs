use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "pulumiservice")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Pulumi Cloud resource provider", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where and how to reach Pulumi Cloud
#[derive(Args, Debug, Clone, Default)]
pub struct ServiceArgs {
    /// Access token for Pulumi Cloud
    #[arg(long, env = "PULUMI_ACCESS_TOKEN", global = true, hide_env_values = true)]
    pub access_token: Option<String>,

    /// Base URL of the Pulumi Cloud service
    #[arg(long, env = "PULUMI_BACKEND_URL", global = true)]
    pub service_url: Option<String>,

    /// Per-call deadline in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Config file (default: ~/.config/pulumiservice/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate and normalize declared inputs
    Check(RequestArgs),

    /// Compare recorded and declared inputs
    Diff(RequestArgs),

    /// Create a resource
    Create(RequestArgs),

    /// Refresh a resource from the service
    Read(RequestArgs),

    /// Update a resource in place
    Update(RequestArgs),

    /// Delete a resource
    Delete(RequestArgs),

    /// Run a JSON-lines file of independent requests in parallel
    Batch(BatchArgs),

    /// List supported resource types
    Types,

    /// Split a resource id into its named fields
    DecodeId {
        /// Type token, e.g. pulumiservice:index:StackTag
        type_token: String,

        /// Resource id
        id: String,
    },

    /// Show resolved configuration
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Lifecycle
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Request document (reads stdin when omitted or "-")
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Pretty-print the response
    #[arg(short, long)]
    pub pretty: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// JSON-lines file, one request per line (reads stdin for "-")
    pub file: PathBuf,

    /// Number of parallel workers
    #[arg(short, long)]
    pub jobs: Option<usize>,
}
