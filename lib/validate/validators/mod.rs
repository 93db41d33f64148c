//! Validation functions for registry entities.

mod executor;
mod function;
mod name;
mod params;
mod prompt;
mod schema;

//--------------------------------------------------------------------------------------------------
// Re-Exports
//--------------------------------------------------------------------------------------------------

pub use executor::{validate_executor, validate_uri};
pub use function::{function_arity, validate_function};
pub use name::{is_valid_name, is_valid_param_name, normalize_name, validate_name};
pub use params::check_params;
pub use prompt::validate_prompt;
pub use schema::validate_schema;
