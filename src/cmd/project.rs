//! Project initialization and status commands.

use anyhow::Result;
use std::path::Path;

pub fn cmd_init(project_dir: &Path) -> Result<()> {
    use forkfleet::init::{init_project, is_initialized};

    let was_initialized = is_initialized(project_dir);

    let result = init_project(project_dir)?;

    if result.created {
        println!(
            "Initialized forkfleet project at {}",
            result.fleet_dir.display()
        );
        println!();
        println!("Created directory structure:");
        println!("  .forkfleet/");
        println!("  ├── fleet.toml        # Configuration (use `forkfleet config init`)");
        println!(
            "  ├── tokens.txt        # Collaborator tokens (use `forkfleet tokens import`)"
        );
        println!(
            "  ├── token_cache.json  # Validated accounts (use `forkfleet tokens validate`)"
        );
        println!("  ├── api_keys.txt      # API keys (use `forkfleet keys import`)");
        println!("  ├── state/            # invited / accepted / forked checklists");
        println!("  └── logs/             # Run logs and failures.log");
        println!();
        println!("Next steps:");
        println!("  1. Run `forkfleet config init` to set the upstream repository");
        println!("  2. Run `forkfleet tokens import <file>` and `forkfleet tokens validate`");
        println!("  3. Run `forkfleet invite`, `forkfleet accept`, then `forkfleet fork`");
    } else if was_initialized {
        println!(
            "Forkfleet project already initialized at {}",
            result.fleet_dir.display()
        );
        println!("Directory structure verified.");
    } else {
        println!(
            "Completed forkfleet initialization at {}",
            result.fleet_dir.display()
        );
    }

    Ok(())
}

/// Read-only summary. Only `--remote` touches the network, and then only
/// with GET requests.
pub async fn cmd_status(project_dir: &Path, remote: bool) -> Result<()> {
    use console::style;
    use forkfleet::accounts::TokenCache;
    use forkfleet::checklist::{Checklist, ChecklistStore, FileChecklistStore};
    use forkfleet::config::Config;
    use forkfleet::init::is_initialized;
    use forkfleet::ui::icons::{CHECK, CROSS, FOLDER, KEY, PROGRESS};

    println!();
    println!("{}", style("Forkfleet Status").bold());
    println!("================");
    println!();

    if !is_initialized(project_dir) {
        println!(
            "{}Not initialized. Run `forkfleet init` first.",
            CROSS
        );
        return Ok(());
    }

    let config = Config::new(project_dir, false)?;
    println!("{}Project: {}", FOLDER, config.fleet_dir.display());

    match config.upstream() {
        Ok(upstream) => println!("{}Upstream: {}", CHECK, style(upstream.full_name()).cyan()),
        Err(e) => println!("{}Upstream: {}", CROSS, style(e).yellow()),
    }

    let cache = TokenCache::load(&config.token_cache_file)?;
    let main = config.toml.upstream.owner.to_lowercase();
    let collaborators = cache
        .iter()
        .filter(|(_, username)| username.to_lowercase() != main)
        .count();
    println!(
        "{}Accounts: {} cached ({} collaborators)",
        KEY,
        cache.len(),
        collaborators
    );

    let store = FileChecklistStore::new(&config.state_dir);
    println!("{}Checklists:", PROGRESS);
    for list in Checklist::ALL {
        let count = store.members(list)?.len();
        println!("  {:<10} {}", list.to_string(), style(count).cyan());
    }

    let key_count = forkfleet::api_keys::read_api_keys(&config.api_keys_file)?.len();
    println!("{}API keys: {}", KEY, key_count);
    println!();

    if remote {
        remote_forks(&config, &store).await?;
    }

    Ok(())
}

/// Probe every collaborator's fork path and compare it with the Forked
/// checklist.
async fn remote_forks(
    config: &forkfleet::config::Config,
    store: &forkfleet::checklist::FileChecklistStore,
) -> Result<()> {
    use console::style;
    use forkfleet::checklist::{Checklist, ChecklistStore};
    use forkfleet::gateway::GitHubGateway;
    use forkfleet::prober::ForkProber;
    use forkfleet::ui::icons::{CHECK, CROSS, FORK, WARN};
    use std::sync::Arc;

    let (upstream, accounts) = config.load_accounts()?;
    let gateway = GitHubGateway::from_toml(&config.toml)?;
    let prober = ForkProber::new(Arc::new(gateway), config.toml.fork.fallback_branch.clone());
    let expected = upstream.full_name();

    println!("{}Forks of {}:", FORK, style(&expected).cyan());
    for account in accounts.collaborators() {
        let record = prober
            .record(&upstream.fork_path(&account.username), &account.token)
            .await;
        let tracked = store.contains(Checklist::Forked, &account.username)?;
        let line = if record.is_fork_of(&expected) {
            format!("{}{} (branch {})", CHECK, record.path, record.default_branch)
        } else if record.exists {
            format!(
                "{}{} exists but is not a fork of {}",
                WARN, record.path, expected
            )
        } else {
            format!("{}{} missing", CROSS, record.path)
        };
        if tracked && !record.is_fork_of(&expected) {
            println!("  {} {}", line, style("(stale checklist entry)").yellow());
        } else {
            println!("  {}", line);
        }
    }
    println!();
    Ok(())
}
