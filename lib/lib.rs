//! `ext-registry` library.

pub mod commands;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod executor;
pub mod format;
pub mod handlers;
pub mod model;
pub mod sandbox;
pub mod secrets;
pub mod server;
pub mod status;
pub mod storage;
pub mod store;
pub mod styles;
pub mod suggest;
pub mod template;
pub mod transfer;
pub mod validate;

//--------------------------------------------------------------------------------------------------
// Re-Exports
//--------------------------------------------------------------------------------------------------

pub use commands::*;
pub use config::*;
pub use constants::*;
pub use context::*;
pub use error::*;
pub use executor::*;
pub use model::*;
pub use secrets::*;
pub use server::*;
pub use status::*;
pub use storage::*;
pub use store::*;
pub use transfer::*;
pub use validate::*;
