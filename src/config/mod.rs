//! Configuration parsing and types.
//!
//! - `types` - Config structure (`Config`, `EnvironmentConfig`, `Endpoints`)
//! - `duration` - Human-readable durations ("30s", "500ms")
//! - `parser` - YAML loading and file locations
//! - `validation` - Config validation

mod duration;
mod parser;
mod types;
mod validation;

pub use duration::*;
pub use parser::*;
pub use types::*;
