// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Output goes to a file because the
/// terminal belongs to the UI.
pub fn init(filter: &str, path: &Path) -> Result<()> {
    let filter = EnvFilter::try_new(filter)
        .with_context(|| format!("invalid log filter {filter:?} -- check MEDJOBS_LOG"))?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].file to a writable path",
                path.display()
            )
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;
    tracing::debug!(path = %path.display(), "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::init;
    use anyhow::Result;

    #[test]
    fn bad_filter_is_rejected_before_touching_disk() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let error = init("medjobs=loud", &temp.path().join("logs/medjobs.log"))
            .expect_err("bad filter should fail");
        assert!(format!("{error:#}").contains("invalid log filter"));
        assert!(!temp.path().join("logs").exists());
        Ok(())
    }
}
