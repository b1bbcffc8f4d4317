use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(name = "awxform")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative reconciliation of AWX credentials, job template links and surveys", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// State file (default: ~/.local/state/awxform/state.json)
    #[arg(long, global = true)]
    pub state: Option<String>,

    /// Give up on remote calls after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection settings that override the config file
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// AWX server URL
    #[arg(long = "url", env = "AWX_URL", global = true, hide_env_values = true)]
    pub url: Option<String>,

    /// OAuth2 token
    #[arg(long = "token", env = "AWX_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Basic auth username
    #[arg(long = "username", env = "AWX_USERNAME", global = true, hide_env_values = true)]
    pub username: Option<String>,

    /// Basic auth password
    #[arg(long = "password", env = "AWX_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check the configuration without contacting the server
    Validate,

    /// Show what apply would change
    Plan(PlanArgs),

    /// Make the server match the configuration
    Apply(ApplyArgs),

    /// Remove every resource tracked in the state file
    Destroy(DestroyArgs),

    /// Adopt an existing server object under a configured address
    Import(ImportArgs),

    /// Inspect or edit the state file
    #[command(subcommand)]
    State(StateCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Only plan matching resources: `type` or `type.name`
    pub target: Option<String>,

    /// Number of parallel refresh jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only apply matching resources: `type` or `type.name`
    pub target: Option<String>,

    /// Show what would be done without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Only destroy matching resources: `type` or `type.name`
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Resource address, e.g. `job_template_credential.deploy`
    pub address: String,

    /// Server identity, e.g. `42` or `7-9`
    pub id: String,
}

#[derive(Subcommand)]
pub enum StateCommand {
    /// List tracked addresses
    List,

    /// Show the recorded attributes of one address
    Show {
        /// Resource address
        address: String,
    },

    /// Stop tracking an address without touching the server
    Rm {
        /// Resource address
        address: String,
    },
}
