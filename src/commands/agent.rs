use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::cli::AgentCommands;
use crate::config::save_settings;

pub fn run(config_file: Option<&Path>, command: AgentCommands) -> Result<()> {
    let (path, mut settings) = super::load(config_file)?;

    match command {
        AgentCommands::Status => {}
        AgentCommands::Enable | AgentCommands::Disable => {
            let enabled = matches!(command, AgentCommands::Enable);
            if settings.agent.enabled != enabled {
                settings.agent.enabled = enabled;
                save_settings(&path, &settings)?;
                info!(path = %path.display(), enabled, "agent preference saved");
            }
        }
    }

    println!(
        "Background checks are {} (every {}).",
        if settings.agent.enabled { "enabled" } else { "disabled" },
        humantime::format_duration(settings.agent.interval())
    );
    Ok(())
}
