//! `extreg` is the registry's command-line interface.

use clap::Parser;
use colored::Colorize;
use ext_registry::handlers;
use ext_registry::{Cli, Command, ImportOptions, RegistryError, RegistryResult, Response};
use tracing_subscriber::EnvFilter;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    // Only enable tracing when RUST_LOG is set.
    init_tracing();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli).await {
        if json {
            let response: Response<()> = Response::err(&e);
            match serde_json::to_string_pretty(&response) {
                Ok(out) => println!("{}", out),
                Err(_) => print_error(&e),
            }
        } else {
            print_error(&e);
        }
        std::process::exit(1);
    }
}

/// Print an error with formatting based on its kind.
fn print_error(e: &RegistryError) {
    println!();
    match e {
        RegistryError::Validation(failure) => {
            println!(
                "  {} {}",
                format!("error[{}]", failure.code).bright_red().bold(),
                failure.field.dimmed()
            );
            println!();
            println!("    {}", failure.message);
        }
        RegistryError::NotFound {
            kind,
            reference,
            suggestion,
        } => {
            println!(
                "  {} {} not found: {}",
                "error".bright_red().bold(),
                kind,
                reference.bright_white()
            );
            if let Some(hint) = suggestion {
                println!();
                println!("    {}: {}", "hint".bright_blue().bold(), hint);
            }
        }
        RegistryError::Conflict { kind, field, value } => {
            println!(
                "  {} {} with {} {} already exists",
                "error[conflict]".bright_red().bold(),
                kind,
                field,
                value.bright_white()
            );
        }
        RegistryError::Disabled { kind, name } => {
            println!(
                "  {} {} {} is disabled",
                "error[disabled]".bright_red().bold(),
                kind,
                name.bright_white()
            );
            println!();
            println!(
                "    {}: check {} and the entity's enabled flag",
                "hint".bright_blue().bold(),
                "extreg status".bright_white()
            );
        }
        RegistryError::Execution(err) => {
            let reason = serde_code(&err.reason);
            println!(
                "  {} {}",
                format!("error[{}]", reason).bright_red().bold(),
                err.message
            );
            if let Some(body) = err.body.as_deref().filter(|b| !b.is_empty()) {
                println!();
                for line in body.lines() {
                    println!("    {}", line.dimmed());
                }
            }
        }
        _ => {
            println!(
                "  {} {}",
                format!("error[{}]", e.code()).bright_red().bold(),
                e
            );
        }
    }
    println!();
}

/// Serialized form of a reason code, e.g. `http_status`.
fn serde_code<T: serde::Serialize>(code: &T) -> String {
    serde_json::to_value(code)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default()
}

/// Initialize tracing. Only enables logging when RUST_LOG is set.
fn init_tracing() {
    let rust_log = std::env::var("RUST_LOG").ok().filter(|s| !s.is_empty());

    // Without a subscriber, all tracing events (including from rmcp) are discarded.
    let Some(rust_log) = rust_log else {
        return;
    };

    let base_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let env_filter = if rust_log.contains("rmcp") {
        base_filter
    } else {
        base_filter.add_directive("rmcp=off".parse().expect("valid directive"))
    };

    // Logs go to stderr so the stdio transport stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

async fn run(cli: Cli) -> RegistryResult<()> {
    let config = cli.config.as_deref();
    let json = cli.json;

    match cli.command {
        Command::Status => handlers::registry_status(config, json).await,

        Command::Enable => handlers::registry_set_enabled(config, true, json).await,

        Command::Disable => handlers::registry_set_enabled(config, false, json).await,

        Command::List { kind } => handlers::entity_list(config, kind, json).await,

        Command::Show { kind, reference } => {
            handlers::entity_show(config, kind, &reference, json).await
        }

        Command::Create { kind, file } => handlers::entity_create(config, kind, &file, json).await,

        Command::Update { kind, id, file } => {
            handlers::entity_update(config, kind, &id, &file, json).await
        }

        Command::Delete { kind, id } => handlers::entity_delete(config, kind, &id, json).await,

        Command::Toggle { kind, id } => handlers::entity_toggle(config, kind, &id, json).await,

        Command::Invoke {
            kind,
            reference,
            param,
            args,
            timeout,
            workspace,
        } => {
            handlers::entity_invoke(
                config,
                kind,
                &reference,
                &param,
                args.as_deref(),
                timeout,
                workspace,
                json,
            )
            .await
        }

        Command::Validate(cmd) => handlers::validate_input(config, cmd, json).await,

        Command::Export {
            tools,
            prompts,
            resources,
            output,
        } => handlers::registry_export(config, tools, prompts, resources, output, json).await,

        Command::Import {
            file,
            strategy,
            no_tools,
            no_prompts,
            no_resources,
        } => {
            let options = ImportOptions {
                conflict_strategy: strategy,
                import_tools: !no_tools,
                import_prompts: !no_prompts,
                import_resources: !no_resources,
            };
            handlers::registry_import(config, &file, options, json).await
        }

        Command::Serve {
            transport,
            host,
            port,
        } => handlers::registry_serve(config, transport, host, port).await,
    }
}
