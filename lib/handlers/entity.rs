//! Entity CRUD handlers.

use std::path::Path;

use colored::Colorize;
use serde_json::json;

use super::common::{open_registry, print_json, read_json};
use crate::error::RegistryResult;
use crate::format::{executor_summary, format_description, highlight_json};
use crate::model::{EntityKind, EntityRecord};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// List entities of a kind.
pub async fn entity_list(config: Option<&Path>, kind: EntityKind, json: bool) -> RegistryResult<()> {
    let (_, registry) = open_registry(config)?;
    let records = registry.list_entities(kind).await;

    if json {
        return print_json(records);
    }

    if records.is_empty() {
        println!("  {} No {} registered", "✗".bright_red(), kind.plural());
        return Ok(());
    }

    println!(
        "  {} {} {}",
        "✓".bright_green(),
        records.len().to_string().bold(),
        kind.plural()
    );
    println!();

    for record in &records {
        let marker = if record.enabled() {
            "●".bright_green()
        } else {
            "○".dimmed()
        };
        let detail = record_detail(record);
        println!("    {} {}  {}", marker, record.name().bold(), detail.dimmed());
        if let Some(desc) = format_description(record.description()) {
            println!("      {}", desc);
        }
        println!("      {}", record.id().dimmed());
    }

    Ok(())
}

/// Show one entity by id, name or uri.
pub async fn entity_show(
    config: Option<&Path>,
    kind: EntityKind,
    reference: &str,
    json: bool,
) -> RegistryResult<()> {
    let (_, registry) = open_registry(config)?;
    let record = registry.find_entity(kind, reference).await?;

    if json {
        return print_json(record);
    }

    println!("{}", highlight_json(&serde_json::to_value(&record)?));
    Ok(())
}

/// Create an entity from a draft file.
pub async fn entity_create(
    config: Option<&Path>,
    kind: EntityKind,
    file: &Path,
    json: bool,
) -> RegistryResult<()> {
    let draft = read_json(file)?;
    let (_, registry) = open_registry(config)?;
    let record = registry.create_entity(kind, draft).await?;

    if json {
        return print_json(record);
    }

    println!(
        "  {} Created {} {} {}",
        "✓".bright_green(),
        kind.to_string().to_lowercase(),
        record.name().bold(),
        format!("({})", record.id()).dimmed()
    );
    Ok(())
}

/// Apply a patch file to an entity.
pub async fn entity_update(
    config: Option<&Path>,
    kind: EntityKind,
    id: &str,
    file: &Path,
    json: bool,
) -> RegistryResult<()> {
    let patch = read_json(file)?;
    let (_, registry) = open_registry(config)?;
    let record = registry.update_entity(kind, id, patch).await?;

    if json {
        return print_json(record);
    }

    println!(
        "  {} Updated {} {}",
        "✓".bright_green(),
        kind.to_string().to_lowercase(),
        record.name().bold()
    );
    Ok(())
}

/// Delete an entity.
pub async fn entity_delete(
    config: Option<&Path>,
    kind: EntityKind,
    id: &str,
    json: bool,
) -> RegistryResult<()> {
    let (_, registry) = open_registry(config)?;
    registry.delete_entity(kind, id).await?;

    if json {
        return print_json(json!({ "id": id }));
    }

    println!(
        "  {} Deleted {} {}",
        "✓".bright_green(),
        kind.to_string().to_lowercase(),
        id.dimmed()
    );
    Ok(())
}

/// Flip an entity's enabled flag.
pub async fn entity_toggle(
    config: Option<&Path>,
    kind: EntityKind,
    id: &str,
    json: bool,
) -> RegistryResult<()> {
    let (_, registry) = open_registry(config)?;
    let record = registry.toggle_entity(kind, id).await?;

    if json {
        return print_json(record);
    }

    let state = if record.enabled() {
        "enabled".bright_green()
    } else {
        "disabled".bright_red()
    };
    println!(
        "  {} {} is now {}",
        "✓".bright_green(),
        record.name().bold(),
        state
    );
    Ok(())
}

fn record_detail(record: &EntityRecord) -> String {
    match record {
        EntityRecord::Tool(tool) => executor_summary(&tool.executor),
        EntityRecord::Prompt(prompt) => match prompt.arguments.len() {
            1 => "1 argument".to_string(),
            n => format!("{} arguments", n),
        },
        EntityRecord::Resource(resource) => format!(
            "{} {}",
            resource.uri,
            executor_summary(&resource.executor)
        ),
    }
}
