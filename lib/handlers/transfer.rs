//! Export and import handlers.

use std::path::{Path, PathBuf};

use colored::Colorize;

use super::common::{open_registry, print_json, read_json};
use crate::error::RegistryResult;
use crate::storage::write_atomic;
use crate::transfer::{ExportSelection, ImportOptions, ImportReport, Selection};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Export entities. With no collection flags, every collection is exported.
pub async fn registry_export(
    config: Option<&Path>,
    tools: bool,
    prompts: bool,
    resources: bool,
    output: Option<PathBuf>,
    json: bool,
) -> RegistryResult<()> {
    let (_, registry) = open_registry(config)?;

    let everything = !tools && !prompts && !resources;
    let pick = |flag: bool| {
        if everything || flag {
            Selection::All
        } else {
            Selection::None
        }
    };
    let selection = ExportSelection {
        tools: pick(tools),
        prompts: pick(prompts),
        resources: pick(resources),
    };

    let document = registry.export(&selection).await;
    let content = serde_json::to_string_pretty(&document)?;

    let Some(path) = output else {
        println!("{}", content);
        return Ok(());
    };

    write_atomic(&path, content.as_bytes())?;

    let tools = document.tools.as_ref().map_or(0, Vec::len);
    let prompts = document.prompts.as_ref().map_or(0, Vec::len);
    let resources = document.resources.as_ref().map_or(0, Vec::len);
    if json {
        return print_json(serde_json::json!({
            "path": path.display().to_string(),
            "tools": tools,
            "prompts": prompts,
            "resources": resources,
        }));
    }

    println!(
        "  {} Exported {} tools, {} prompts, {} resources to {}",
        "✓".bright_green(),
        tools,
        prompts,
        resources,
        path.display().to_string().bold()
    );
    Ok(())
}

/// Import an export document.
pub async fn registry_import(
    config: Option<&Path>,
    file: &Path,
    options: ImportOptions,
    json: bool,
) -> RegistryResult<()> {
    let document = read_json(file)?;
    let (_, registry) = open_registry(config)?;
    let report = registry.import(&document, &options).await?;

    if json {
        return print_json(report);
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &ImportReport) {
    let symbol = if report.errors.is_empty() {
        "✓".bright_green()
    } else {
        "⚠".bright_yellow()
    };
    println!(
        "  {} Imported {} tools, {} prompts, {} resources",
        symbol, report.imported.tools, report.imported.prompts, report.imported.resources
    );

    let skipped = [
        ("tools", &report.skipped.tools),
        ("prompts", &report.skipped.prompts),
        ("resources", &report.skipped.resources),
    ];
    if report.skipped_total() > 0 {
        println!();
        println!("    {}", "Skipped (already exist):".dimmed());
        for (label, names) in skipped.iter().filter(|(_, names)| !names.is_empty()) {
            println!("      {}: {}", label, names.join(", "));
        }
    }

    if !report.errors.is_empty() {
        println!();
        println!("    {}", "Errors:".bright_red());
        for error in &report.errors {
            println!(
                "      {} {} {}",
                error.kind.to_string().to_lowercase().dimmed(),
                error.name.bold(),
                error.reason
            );
        }
    }
}
