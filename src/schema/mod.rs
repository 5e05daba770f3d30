//! Schema module - Data model and configuration types for pattern mining.

mod config;
mod corpus;

pub use config::*;
pub use corpus::*;
