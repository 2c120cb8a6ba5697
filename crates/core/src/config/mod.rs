//! Configuration loading and schema definitions
//!
//! TOML configuration shared by the responder, its adapters and the CLI.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
