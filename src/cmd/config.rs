//! Configuration view, validation and bootstrap: `forkfleet config`.

use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::ConfigCommands;

pub async fn cmd_config(project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    use forkfleet::fleet_config::{CONFIG_FILE, FleetToml, MAIN_TOKEN_ENV};
    use forkfleet::init::get_fleet_dir;

    let fleet_dir = get_fleet_dir(project_dir);
    let config_path = fleet_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Forkfleet Configuration");
            println!("=======================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                FleetToml::load(&config_path)?
            } else {
                println!("No fleet.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                FleetToml::default()
            };

            println!("[upstream]");
            println!("  owner = \"{}\"", toml.upstream.owner);
            println!("  repo = \"{}\"", toml.upstream.repo);
            println!(
                "  token = {}",
                if toml.upstream.token.is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
            );
            println!();
            println!("[fork]");
            println!("  workflow = \"{}\"", toml.fork.workflow);
            println!("  fallback_branch = \"{}\"", toml.fork.fallback_branch);
            println!("  poll_interval_secs = {}", toml.fork.poll_interval_secs);
            println!("  poll_timeout_secs = {}", toml.fork.poll_timeout_secs);
            println!();
            println!("[pacing]");
            println!("  account_delay_secs = {}", toml.pacing.account_delay_secs);
            println!("  step_delay_secs = {}", toml.pacing.step_delay_secs);
            println!(
                "  deletion_settle_secs = {}",
                toml.pacing.deletion_settle_secs
            );
            println!();
            println!("[gateway]");
            println!("  api_url = \"{}\"", toml.gateway.api_url);
            println!(
                "  request_timeout_secs = {}",
                toml.gateway.request_timeout_secs
            );
            println!("  backoff_base_ms = {}", toml.gateway.backoff_base_ms);
            println!();

            println!("Effective values (with env overrides):");
            println!("  api_url = \"{}\"", toml.api_url());
            println!(
                "  main token = {}",
                match (toml.main_token(), std::env::var(MAIN_TOKEN_ENV).is_ok()) {
                    (Some(_), true) => format!("(from {})", MAIN_TOKEN_ENV),
                    (Some(_), false) => "(from fleet.toml)".to_string(),
                    (None, _) => "(missing)".to_string(),
                }
            );
            println!();
            if !config_path.exists() {
                println!("Run 'forkfleet config init' to create a fleet.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                bail!(
                    "No fleet.toml found at {}. Run 'forkfleet config init' first.",
                    config_path.display()
                );
            }

            let toml = FleetToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init { owner, repo, token }) => {
            config_init(&fleet_dir, &config_path, owner, repo, token).await?;
        }
    }

    Ok(())
}

fn prompt_if_missing(value: Option<String>, prompt: &str) -> Result<String> {
    use dialoguer::Input;

    let value = match value {
        Some(v) => v,
        None => Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .with_context(|| format!("Failed to read {}", prompt))?,
    };
    let value = value.trim().to_string();
    if value.is_empty() {
        bail!("{} must not be empty", prompt);
    }
    Ok(value)
}

async fn config_init(
    fleet_dir: &Path,
    config_path: &Path,
    owner: Option<String>,
    repo: Option<String>,
    token: Option<String>,
) -> Result<()> {
    use forkfleet::fleet_config::FleetToml;
    use forkfleet::gateway::GitHubGateway;
    use forkfleet::poll::TokioClock;
    use forkfleet::tokens::TokenValidator;
    use forkfleet::ui;
    use std::sync::Arc;

    let mut toml = FleetToml::load_or_default(fleet_dir)?;

    let owner = prompt_if_missing(owner, "Main account username")?;
    let repo = prompt_if_missing(repo, "Main repository name")?;
    let token = prompt_if_missing(token, "Main account token")?;

    ui::info("Validating main account token...");
    let gateway = GitHubGateway::from_toml(&toml)?;
    let validator = TokenValidator::new(Arc::new(gateway), Arc::new(TokioClock));
    let login = match validator.login(&token).await {
        Ok(login) => login,
        Err(e) => bail!("Main account token is invalid: {}", e),
    };
    if !login.eq_ignore_ascii_case(&owner) {
        ui::warning(format!(
            "Token authenticates as @{}, not @{}",
            login, owner
        ));
    }

    std::fs::create_dir_all(fleet_dir)
        .with_context(|| format!("Failed to create {}", fleet_dir.display()))?;
    toml.upstream.owner = owner;
    toml.upstream.repo = repo;
    toml.upstream.token = Some(token);
    toml.save(config_path)?;

    ui::success(format!(
        "Saved {} for {}/{}",
        config_path.display(),
        toml.upstream.owner,
        toml.upstream.repo
    ));
    Ok(())
}
