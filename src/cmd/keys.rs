//! API key import and status: `forkfleet keys`.

use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::KeyCommands;

pub fn cmd_keys(project_dir: &Path, command: KeyCommands) -> Result<()> {
    use forkfleet::api_keys::{import_api_keys, key_status, save_api_keys};
    use forkfleet::config::Config;
    use forkfleet::ui;

    let config = Config::new(project_dir, false)?;

    match command {
        KeyCommands::Import { file: Some(file) } => {
            ui::header("IMPORT API KEYS");
            config.ensure_directories()?;
            let count = import_api_keys(&file, &config.api_keys_file)
                .with_context(|| format!("Failed to import API keys from {}", file.display()))?;
            ui::success(format!("Saved {} API key(s)", count));
        }
        KeyCommands::Import { file: None } => {
            ui::header("IMPORT API KEYS");
            let keys = prompt_keys()?;
            config.ensure_directories()?;
            let count = save_api_keys(&keys, &config.api_keys_file, "manual entry")?;
            ui::success(format!("Saved {} API key(s)", count));
        }
        KeyCommands::Status => {
            ui::header("API KEYS");
            match key_status(&config.api_keys_file)? {
                None => ui::warning("No API keys file yet. Run `forkfleet keys import`."),
                Some(status) => {
                    ui::success(format!("Total API keys: {}", status.count));
                    if !status.preview.is_empty() {
                        ui::info("Preview:");
                        for (i, masked) in status.preview.iter().enumerate() {
                            println!("  {}. {}", i + 1, masked);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Read keys one per prompt until an empty line. Malformed keys are skipped.
fn prompt_keys() -> Result<Vec<String>> {
    use dialoguer::Input;
    use forkfleet::api_keys::is_valid_api_key;
    use forkfleet::ui;

    if !console::user_attended() {
        bail!("No terminal to prompt on; pass a file: forkfleet keys import <file>");
    }
    ui::info("Enter API keys, one per prompt. Leave empty to finish.");
    let mut keys: Vec<String> = Vec::new();
    loop {
        let key: String = Input::new()
            .with_prompt(format!("API key #{}", keys.len() + 1))
            .allow_empty(true)
            .interact_text()
            .context("Failed to read API key")?;
        let key = key.trim().to_string();
        if key.is_empty() {
            break;
        }
        if !is_valid_api_key(&key) {
            ui::warning("Invalid API key format, skipped");
            continue;
        }
        keys.push(key);
    }
    Ok(keys)
}
