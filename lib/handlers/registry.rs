//! Status and global gate handlers.

use std::path::Path;

use colored::Colorize;

use super::common::{open_registry, print_json};
use crate::error::RegistryResult;
use crate::status::RegistryStatus;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Show registry status.
pub async fn registry_status(config: Option<&Path>, json: bool) -> RegistryResult<()> {
    let (_, registry) = open_registry(config)?;
    let status = registry.status().await;

    if json {
        return print_json(status);
    }

    print_status(&status);
    Ok(())
}

/// Open or close the global gate.
pub async fn registry_set_enabled(
    config: Option<&Path>,
    enabled: bool,
    json: bool,
) -> RegistryResult<()> {
    let (_, registry) = open_registry(config)?;
    let status = if enabled {
        registry.enable().await?
    } else {
        registry.disable().await?
    };

    if json {
        return print_json(status);
    }

    if enabled {
        println!("  {} Registry enabled", "✓".bright_green());
    } else {
        println!(
            "  {} Registry disabled {}",
            "✓".bright_green(),
            "(all invocations are refused)".dimmed()
        );
    }
    Ok(())
}

fn print_status(status: &RegistryStatus) {
    let state = if status.enabled {
        "enabled".bright_green()
    } else {
        "disabled".bright_red()
    };
    println!("  {} {}", "Registry".bold(), state);
    println!();

    for (label, total, enabled) in [
        ("Tools", status.tools_count, status.enabled_tools_count),
        ("Prompts", status.prompts_count, status.enabled_prompts_count),
        ("Resources", status.resources_count, status.enabled_resources_count),
    ] {
        println!(
            "    {:<10} {} {}",
            label,
            total.to_string().bright_cyan(),
            format!("({} enabled)", enabled).dimmed()
        );
    }
}
