//! Token import and validation: `forkfleet tokens`.

use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::{Cli, TokenCommands};

pub async fn cmd_tokens(project_dir: &Path, cli: &Cli, command: TokenCommands) -> Result<()> {
    use forkfleet::config::Config;
    use forkfleet::tokens::import_tokens;
    use forkfleet::ui;

    let config = Config::new(project_dir, cli.verbose)?;
    config.ensure_directories()?;

    match command {
        TokenCommands::Import { file } => {
            ui::header("IMPORT TOKENS");
            let count = import_tokens(&file, &config.tokens_file)
                .with_context(|| format!("Failed to import tokens from {}", file.display()))?;
            ui::success(format!(
                "Imported {} token(s) into {}",
                count,
                config.tokens_file.display()
            ));
            ui::info("Run `forkfleet tokens validate` to resolve their accounts.");
        }
        TokenCommands::Validate => validate(&config).await?,
    }

    Ok(())
}

async fn validate(config: &forkfleet::config::Config) -> Result<()> {
    use forkfleet::accounts::TokenCache;
    use forkfleet::fleet::Fleet;
    use forkfleet::tokens::{read_tokens, write_tokens};
    use forkfleet::ui::{self, FleetUI};

    ui::header("VALIDATE TOKENS");
    let tokens = read_tokens(&config.tokens_file)?;
    if tokens.is_empty() {
        bail!(
            "No tokens in {}. Run `forkfleet tokens import <file>` first.",
            config.tokens_file.display()
        );
    }

    let mut cache = TokenCache::load(&config.token_cache_file)?;
    let fleet = Fleet::from_config(config)?;
    let progress = FleetUI::new("Tokens", tokens.len() as u64, config.verbose);

    let report = fleet
        .token_validator()
        .validate(&tokens, &mut cache, &mut |index, status| {
            progress.token_done(index, status)
        })
        .await;
    progress.finish();

    cache
        .save(&config.token_cache_file)
        .context("Failed to save token cache")?;
    write_tokens(&config.tokens_file, &report.valid).context("Failed to rewrite tokens file")?;

    println!();
    ui::success(format!(
        "{} valid ({} cached), {} invalid, {} total",
        report.valid.len(),
        report.cached,
        report.invalid,
        tokens.len()
    ));
    if report.invalid > 0 {
        ui::warning(format!(
            "Removed {} invalid token(s) from {}",
            report.invalid,
            config.tokens_file.display()
        ));
    }
    Ok(())
}
