//! Configuration for the recap toolkit
//!
//! Settings live in the pipeline's `config.toml` next to its own `[app]`
//! section, with CI environment variables layered on top.

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;


use crate::errors::Result;
use std::path::Path;

/// Load a configuration from a TOML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<RecapConfig> {
    ConfigLoader::from_file(path).await
}
