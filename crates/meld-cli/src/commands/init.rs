//! Default scene config

use anyhow::{Context, Result};
use meld_core::SceneConfig;
use std::path::Path;

pub fn run(path: &str, force: bool) -> Result<()> {
    let target = Path::new(path);
    if target.exists() && !force {
        anyhow::bail!("'{}' already exists (use --force to overwrite)", path);
    }
    SceneConfig::default()
        .save(target)
        .with_context(|| format!("Failed to write '{}'", path))?;
    println!("Wrote default scene config to {}", path);
    Ok(())
}
