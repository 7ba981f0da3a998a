use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::DistroLayout;

/// Removes runtime caches under userdata; returns the directories removed.
pub fn clear_caches(layout: &DistroLayout) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for dir in layout.cache_dirs() {
        if !dir.exists() {
            continue;
        }
        fs::remove_dir_all(&dir)
            .with_context(|| format!("failed to remove cache directory {}", dir.display()))?;
        removed.push(dir);
    }
    Ok(removed)
}

pub fn purge_staging(layout: &DistroLayout) -> Result<bool> {
    let staging = layout.staging();
    if !staging.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(staging)
        .with_context(|| format!("failed to remove staging directory {}", staging.display()))?;
    Ok(true)
}
