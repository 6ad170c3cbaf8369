use std::io::IsTerminal;

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input};
use titlecast_runtime_config::BridgeConfig;

/// Whether stdin and stdout are both attached to a terminal.
pub fn can_prompt() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Ask for the settings a first run needs, starting from `config`.
pub fn prompt(mut config: BridgeConfig) -> Result<BridgeConfig> {
    let client_id: String = Input::new()
        .with_prompt("Discord application (client) id")
        .with_initial_text(config.presence.client_id.clone())
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            match input.trim().parse::<i64>() {
                Ok(id) if id > 0 => Ok(()),
                _ => Err("expected a numeric application id"),
            }
        })
        .interact_text()
        .context("failed to read client id")?;

    let console_ip: String = Input::new()
        .with_prompt("Console IP address")
        .with_initial_text(config.console.ip.clone())
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            if input.trim().is_empty() {
                Err("console IP is required")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("failed to read console IP")?;

    let buttons_enabled = Confirm::new()
        .with_prompt("Show a \"View Game\" button on your profile?")
        .default(config.presence.buttons_enabled)
        .interact()
        .context("failed to read button preference")?;

    config.presence.client_id = client_id.trim().to_string();
    config.console.ip = console_ip.trim().to_string();
    config.presence.buttons_enabled = buttons_enabled;
    Ok(config)
}
