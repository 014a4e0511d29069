//! Fork create/sync command: `forkfleet fork`.

use anyhow::{Context, Result, bail};
use std::path::Path;

use forkfleet::errors::FleetError;
use forkfleet::fork::{ForkMode, ModeChoice};

use crate::Cli;

/// Ask for the mode when it was not given on the command line.
fn select_mode(requested: Option<ModeChoice>) -> Result<ModeChoice> {
    use dialoguer::{Select, theme::ColorfulTheme};

    if let Some(choice) = requested {
        return Ok(choice);
    }
    if !console::user_attended() {
        bail!("No terminal to prompt on; pass --mode sync or --mode force-clean");
    }
    let labels: Vec<&str> = ModeChoice::ALL.iter().map(|c| c.label()).collect();
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Operation mode")
        .items(&labels)
        .interact()
        .context("Failed to read mode selection")?;
    Ok(ModeChoice::ALL[index])
}

/// Destructive mode needs an explicit yes. There is no default answer.
fn confirm_deletion(choice: ModeChoice, assume_yes: bool) -> Result<Option<bool>> {
    use dialoguer::Confirm;

    if !choice.is_destructive() {
        return Ok(None);
    }
    if assume_yes {
        return Ok(Some(true));
    }
    if !console::user_attended() {
        return Ok(None);
    }
    let answer = Confirm::new()
        .with_prompt("This DELETES every existing repository at the fork paths. Continue?")
        .interact()
        .context("Failed to read confirmation")?;
    Ok(Some(answer))
}

pub async fn cmd_fork(project_dir: &Path, cli: &Cli, mode: Option<ModeChoice>) -> Result<()> {
    use forkfleet::config::Config;
    use forkfleet::fleet::{Fleet, RunLock};
    use forkfleet::ui::{self, FleetUI};

    ui::header("CREATE OR SYNC FORKS");
    let config = Config::new(project_dir, cli.verbose)?;
    // Fatal configuration errors surface before any prompt or remote call.
    let (upstream, accounts) = config.load_accounts()?;

    if accounts.collaborator_count() == 0 {
        ui::success("No collaborator accounts to process.");
        return Ok(());
    }
    ui::info(format!("Source repository: {}", upstream.full_name()));
    ui::info(format!(
        "Collaborators to process: {}",
        accounts.collaborator_count()
    ));

    let choice = select_mode(mode)?;
    if choice.is_destructive() {
        ui::warning("Mode: Force Clean & Create. Existing repositories will be deleted.");
    } else {
        ui::info("Mode: Sync & Keep");
    }
    let confirmed = confirm_deletion(choice, cli.yes)?;
    let mode = match ForkMode::resolve(choice, confirmed) {
        Ok(mode) => mode,
        Err(FleetError::ConfirmationDeclined) => {
            ui::warning("Operation cancelled");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let _lock = RunLock::acquire(&config.lock_file)?;
    let fleet = Fleet::from_config(&config)?;
    let orchestrator = fleet.fork_orchestrator(upstream);

    let progress = FleetUI::new("Forks", accounts.collaborator_count() as u64, cli.verbose);
    let report = orchestrator
        .run_observed(&accounts, mode, &progress)
        .await;
    progress.finish();

    println!();
    ui::success("Done!");
    ui::info(format!(
        "Succeeded: {}, Failed: {}, Total: {}",
        report.success_count, report.failed_count, report.total
    ));
    if report.failed_count > 0 {
        ui::warning(format!(
            "Failure details: {}",
            config.failure_log.display()
        ));
    }
    Ok(())
}
