//! Validate command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use streamframe_core::Config;

/// Load and validate a configuration file, then print the effective window.
pub fn run(path: &Path) -> Result<()> {
    let config = Config::from_file(path)
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    let options = config.buffer.options()?;

    println!("Configuration is valid");
    println!("  max_length: {}", describe(options.window.max_length));
    println!("  max_delta:  {}", describe(options.window.max_delta));
    println!("  action:     {:?}", options.action);
    Ok(())
}

fn describe<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "unbounded".to_string(), |v| v.to_string())
}
