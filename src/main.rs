use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "forkfleet")]
#[command(
    version,
    about = "Invite collaborators, accept invitations, and create or sync their forks of an upstream repository"
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to confirmation prompts (including destructive mode)
    #[arg(long, global = true)]
    pub yes: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Emit console logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the .forkfleet/ directory
    Init,
    /// Show project, account and checklist status
    Status {
        /// Also probe each collaborator's fork on GitHub (read-only)
        #[arg(long)]
        remote: bool,
    },
    /// Manage fleet.toml
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Import and validate collaborator tokens
    Tokens {
        #[command(subcommand)]
        command: TokenCommands,
    },
    /// Store and inspect third-party API keys
    Keys {
        #[command(subcommand)]
        command: KeyCommands,
    },
    /// Invite every collaborator to the upstream repository
    Invite,
    /// Accept pending invitations on behalf of every collaborator
    Accept,
    /// Create or sync each collaborator's fork
    Fork {
        /// sync (sync & keep) or force-clean (delete, then recreate)
        #[arg(short, long)]
        mode: Option<forkfleet::fork::ModeChoice>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Check the configuration for problems
    Validate,
    /// Write fleet.toml after validating the main account token
    Init {
        /// Main account username
        #[arg(long)]
        owner: Option<String>,
        /// Upstream repository name
        #[arg(long)]
        repo: Option<String>,
        /// Main account token
        #[arg(long)]
        token: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum TokenCommands {
    /// Import tokens from a file (one per line)
    Import { file: PathBuf },
    /// Resolve every imported token to its login and drop invalid ones
    Validate,
}

#[derive(Subcommand, Clone)]
pub enum KeyCommands {
    /// Import API keys from a file, or type them in when no file is given
    Import { file: Option<PathBuf> },
    /// Show how many keys are stored, with a masked preview
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let log_dir = forkfleet::init::is_initialized(&project_dir)
        .then(|| forkfleet::init::get_fleet_dir(&project_dir).join("logs"));
    let _log_guard =
        forkfleet::telemetry::init_tracing(cli.verbose, cli.json_logs, log_dir.as_deref());

    match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Status { remote } => cmd::cmd_status(&project_dir, *remote).await?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone()).await?,
        Commands::Tokens { command } => cmd::cmd_tokens(&project_dir, &cli, command.clone()).await?,
        Commands::Keys { command } => cmd::cmd_keys(&project_dir, command.clone())?,
        Commands::Invite => cmd::cmd_invite(&project_dir, &cli).await?,
        Commands::Accept => cmd::cmd_accept(&project_dir, &cli).await?,
        Commands::Fork { mode } => cmd::cmd_fork(&project_dir, &cli, *mode).await?,
    }

    Ok(())
}
