//! Collaborator invite and accept commands.

use anyhow::Result;
use std::path::Path;

use crate::Cli;

pub async fn cmd_invite(project_dir: &Path, cli: &Cli) -> Result<()> {
    use forkfleet::config::Config;
    use forkfleet::fleet::{Fleet, RunLock};
    use forkfleet::ui::{self, FleetUI};

    ui::header("INVITE COLLABORATORS");
    let config = Config::new(project_dir, cli.verbose)?;
    // Configuration problems abort here, before any remote call.
    let (upstream, accounts) = config.load_accounts()?;
    let _lock = RunLock::acquire(&config.lock_file)?;

    let fleet = Fleet::from_config(&config)?;
    let flow = fleet.invite_flow(upstream.clone());
    let pending = flow.candidates(&accounts)?;
    if pending.is_empty() {
        ui::success("All accounts are already invited.");
        return Ok(());
    }

    ui::info(format!(
        "Inviting {} account(s) to {}",
        pending.len(),
        upstream.full_name()
    ));
    let progress = FleetUI::new("Invite", pending.len() as u64, cli.verbose);
    let report = flow
        .run(&accounts, &mut |index, total, username, status| {
            progress.invite_done(index, total, username, status)
        })
        .await?;
    progress.finish();

    println!();
    ui::success(format!(
        "Invited: {}, Failed: {}, Total: {}",
        report.invited, report.failed, report.candidates
    ));
    Ok(())
}

pub async fn cmd_accept(project_dir: &Path, cli: &Cli) -> Result<()> {
    use forkfleet::config::Config;
    use forkfleet::fleet::{Fleet, RunLock};
    use forkfleet::ui::{self, FleetUI};

    ui::header("ACCEPT INVITATIONS");
    let config = Config::new(project_dir, cli.verbose)?;
    let (upstream, accounts) = config.load_accounts()?;
    let _lock = RunLock::acquire(&config.lock_file)?;

    let fleet = Fleet::from_config(&config)?;
    ui::info(format!(
        "Target: {} ({} account(s))",
        upstream.full_name(),
        accounts.collaborator_count()
    ));

    let progress = FleetUI::new("Accept", accounts.collaborator_count() as u64, cli.verbose);
    let report = fleet
        .accept_flow(upstream)
        .run(&accounts, &mut |index, total, username, status| {
            progress.accept_done(index, total, username, status)
        })
        .await?;
    progress.finish();

    println!();
    ui::success(format!(
        "Accepted: {}, Already accepted: {}, No invitation: {}, Failed: {}, Total: {}",
        report.accepted,
        report.already_accepted,
        report.no_invitation,
        report.failed,
        report.total
    ));
    Ok(())
}
