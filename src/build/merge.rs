use std::{fs, path::Path};

use anyhow::{Context, Result};

/// Copies `src` into `dst`, overwriting same-named files and never deleting
/// anything already in `dst`. Old hashed chunks stay reachable for clients
/// still running the previous build. Returns the number of files copied.
pub fn merge_into(src: &Path, dst: &Path) -> Result<usize> {
    if !src.exists() {
        return Ok(0);
    }

    if src.is_dir() {
        fs::create_dir_all(dst).with_context(|| format!("Failed to create {}", dst.display()))?;
        let mut copied = 0;
        for entry in
            fs::read_dir(src).with_context(|| format!("Failed to list {}", src.display()))?
        {
            let entry = entry?;
            copied += merge_into(&entry.path(), &dst.join(entry.file_name()))?;
        }
        Ok(copied)
    } else {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::copy(src, dst)
            .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;
        Ok(1)
    }
}
