//! Validate command handlers.

use std::path::Path;

use colored::Colorize;

use super::common::{open_registry, print_json, read_input, read_json};
use crate::commands::ValidateCommand;
use crate::error::RegistryResult;
use crate::validate::ValidationOutcome;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Run a validator and report the outcome. Exits non-zero when invalid.
pub async fn validate_input(
    config: Option<&Path>,
    cmd: ValidateCommand,
    json: bool,
) -> RegistryResult<()> {
    let (_, registry) = open_registry(config)?;

    let (subject, outcome) = match cmd {
        ValidateCommand::Name {
            name,
            kind,
            exclude_id,
        } => {
            let outcome = registry
                .validate_name(&name, kind, exclude_id.as_deref())
                .await;
            (format!("{} name `{}`", kind.to_string().to_lowercase(), name), outcome)
        }
        ValidateCommand::Schema { file } => {
            let schema = read_json(&file)?;
            ("input schema".to_string(), registry.validate_schema(&schema))
        }
        ValidateCommand::Function { file } => {
            let code = read_input(&file)?;
            ("function".to_string(), registry.validate_function(&code))
        }
        ValidateCommand::Uri { uri, exclude_id } => {
            let outcome = registry.validate_uri(&uri, exclude_id.as_deref()).await;
            (format!("uri `{}`", uri), outcome)
        }
    };

    let valid = outcome.valid;
    if json {
        print_json(&outcome)?;
    } else {
        print_outcome(&subject, &outcome);
    }

    if !valid {
        std::process::exit(1);
    }
    Ok(())
}

fn print_outcome(subject: &str, outcome: &ValidationOutcome) {
    if outcome.valid {
        println!("  {} Valid {}", "✓".bright_green(), subject);
    } else {
        println!("  {} Invalid {}", "✗".bright_red(), subject);
        if let Some(error) = &outcome.error {
            println!("    {} {}", "error:".bright_red().bold(), error);
        }
    }

    for warning in &outcome.warnings {
        println!("    {} {}", "warning:".bright_yellow().bold(), warning);
    }
}
