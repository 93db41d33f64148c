//! CLI command definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::examples;
use crate::model::EntityKind;
use crate::server::ServeTransport;
use crate::styles::styles;
use crate::transfer::ConflictStrategy;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const LIST_EXAMPLES: &str = examples![
    "extreg list tools                 " # "List all tools",
    "extreg list resources --json      " # "JSON output for parsing",
];

const CREATE_EXAMPLES: &str = examples![
    "extreg create tool -f weather.json" # "Create a tool from a draft file",
    "extreg create prompt -f review.json" # "Create a prompt",
    "cat res.json | extreg create resource -f -" # "Read the draft from stdin",
];

const UPDATE_EXAMPLES: &str = examples![
    "extreg update tool <id> -f patch.json" # "Apply a partial update",
];

const INVOKE_EXAMPLES: &str = examples![
    "extreg invoke tool weather -p city=nyc" # "Invoke a tool with a string param",
    "extreg invoke tool sum -p a=1 -p b=2  " # "Values parse as JSON when they can",
    "extreg invoke tool search --args '{\"q\":\"rust\"}'" # "Pass params as a JSON object",
    "extreg invoke prompt review -p file=main.rs" # "Render a prompt",
    "extreg invoke resource app://config   " # "Read a resource by uri",
    "extreg invoke tool slow --timeout 5   " # "Override the HTTP timeout",
];

const VALIDATE_EXAMPLES: &str = examples![
    "extreg validate name get_weather      " # "Check a tool name",
    "extreg validate name docs -k resource " # "Check against another collection",
    "extreg validate schema -f schema.json " # "Check an input schema",
    "extreg validate function -f fn.js     " # "Check function source",
    "extreg validate uri app://config      " # "Check a resource uri",
];

const EXPORT_EXAMPLES: &str = examples![
    "extreg export                     " # "Export everything to stdout",
    "extreg export --tools -o tools.json" # "Export tools only",
];

const IMPORT_EXAMPLES: &str = examples![
    "extreg import backup.json         " # "Import, skipping existing names",
    "extreg import backup.json -s replace" # "Overwrite existing entities",
    "extreg import backup.json --no-resources" # "Leave resources out",
];

const SERVE_EXAMPLES: &str = examples![
    "extreg serve                      " # "Serve over stdio",
    "extreg serve -t http              " # "Serve streamable HTTP at /mcp",
    "extreg serve -t http --port 8080  " # "Custom port",
];

const CLI_EXAMPLES: &str = examples![
    "extreg status                     " # "Show counts and the global gate",
    "extreg create tool -f weather.json" # "Register a tool",
    "extreg invoke tool weather -p city=nyc" # "Invoke it",
    "extreg disable                    " # "Refuse every invocation",
    "extreg serve -t http              " # "Expose enabled entities over MCP",
];

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Dynamic extension registry.
#[derive(Debug, Parser)]
#[command(name = "extreg", author, version, styles=styles())]
#[command(
    about = "Manage runtime-defined tools, prompts and resources",
    after_help = CLI_EXAMPLES
)]
pub struct Cli {
    /// Output JSON envelopes instead of formatted text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to config.toml (default: ~/.extreg/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show registry status.
    Status,

    /// Enable the registry.
    Enable,

    /// Disable the registry. Invocations are refused until re-enabled.
    Disable,

    /// List entities of a kind.
    #[command(after_help = LIST_EXAMPLES)]
    List {
        /// tool, prompt or resource.
        kind: EntityKind,
    },

    /// Show one entity.
    Show {
        /// tool, prompt or resource.
        kind: EntityKind,

        /// Entity id, name or (for resources) uri.
        reference: String,
    },

    /// Create an entity from a JSON draft.
    #[command(after_help = CREATE_EXAMPLES)]
    Create {
        /// tool, prompt or resource.
        kind: EntityKind,

        /// Draft file (`-` for stdin).
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Update an entity from a JSON patch.
    #[command(after_help = UPDATE_EXAMPLES)]
    Update {
        /// tool, prompt or resource.
        kind: EntityKind,

        /// Entity id.
        id: String,

        /// Patch file (`-` for stdin).
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Delete an entity.
    Delete {
        /// tool, prompt or resource.
        kind: EntityKind,

        /// Entity id.
        id: String,
    },

    /// Flip an entity's enabled flag.
    Toggle {
        /// tool, prompt or resource.
        kind: EntityKind,

        /// Entity id.
        id: String,
    },

    /// Invoke a tool, render a prompt or read a resource.
    #[command(after_help = INVOKE_EXAMPLES)]
    Invoke {
        /// tool, prompt or resource.
        kind: EntityKind,

        /// Entity id, name or (for resources) uri.
        reference: String,

        /// Parameter as key=value (repeatable).
        #[arg(short = 'p', long = "param")]
        param: Vec<String>,

        /// Parameters as a JSON object. Merged under -p values.
        #[arg(long)]
        args: Option<String>,

        /// HTTP timeout override in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Workspace id for SESSION placeholders.
        #[arg(long)]
        workspace: Option<String>,
    },

    /// Validate input without writing anything.
    #[command(subcommand)]
    Validate(ValidateCommand),

    /// Export entities to a document.
    #[command(after_help = EXPORT_EXAMPLES)]
    Export {
        /// Include tools.
        #[arg(long)]
        tools: bool,

        /// Include prompts.
        #[arg(long)]
        prompts: bool,

        /// Include resources.
        #[arg(long)]
        resources: bool,

        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import entities from a document.
    #[command(after_help = IMPORT_EXAMPLES)]
    Import {
        /// Export document (`-` for stdin).
        file: PathBuf,

        /// What to do with entities that already exist.
        #[arg(short, long, value_enum, default_value_t = ConflictStrategy::Skip)]
        strategy: ConflictStrategy,

        /// Leave tools out.
        #[arg(long)]
        no_tools: bool,

        /// Leave prompts out.
        #[arg(long)]
        no_prompts: bool,

        /// Leave resources out.
        #[arg(long)]
        no_resources: bool,
    },

    /// Serve enabled entities over MCP.
    #[command(after_help = SERVE_EXAMPLES)]
    Serve {
        /// Transport: stdio or http.
        #[arg(short, long, default_value = "stdio")]
        transport: ServeTransport,

        /// Host to bind (http only).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (http only).
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Validation subcommands.
#[derive(Debug, Subcommand)]
#[command(after_help = VALIDATE_EXAMPLES)]
pub enum ValidateCommand {
    /// Check an entity name.
    Name {
        name: String,

        /// Collection to check uniqueness against.
        #[arg(short, long, default_value = "tool")]
        kind: EntityKind,

        /// Ignore this entity when checking uniqueness.
        #[arg(long)]
        exclude_id: Option<String>,
    },

    /// Check a tool input schema.
    Schema {
        /// Schema file (`-` for stdin).
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Check function executor source.
    Function {
        /// Source file (`-` for stdin).
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Check a resource uri.
    Uri {
        uri: String,

        /// Ignore this resource when checking uniqueness.
        #[arg(long)]
        exclude_id: Option<String>,
    },
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl clap::ValueEnum for ConflictStrategy {
    fn value_variants<'a>() -> &'a [Self] {
        &[ConflictStrategy::Skip, ConflictStrategy::Replace]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            ConflictStrategy::Skip => clap::builder::PossibleValue::new("skip"),
            ConflictStrategy::Replace => clap::builder::PossibleValue::new("replace"),
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
