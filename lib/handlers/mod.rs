//! Command handlers for the `extreg` CLI.

mod common;
mod entity;
mod invoke;
mod registry;
mod serve;
mod transfer;
mod validate_cmd;

//--------------------------------------------------------------------------------------------------
// Re-Exports
//--------------------------------------------------------------------------------------------------

pub use common::{load_config, open_registry, parse_params};
pub use entity::{
    entity_create, entity_delete, entity_list, entity_show, entity_toggle, entity_update,
};
pub use invoke::entity_invoke;
pub use registry::{registry_set_enabled, registry_status};
pub use serve::registry_serve;
pub use transfer::{registry_export, registry_import};
pub use validate_cmd::validate_input;
