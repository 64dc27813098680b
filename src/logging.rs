use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/// Install a tracing subscriber writing to `path`. The UI owns the
/// terminal, so logs go to a file for `tail -f` instead of the screen.
/// Respects `RUST_LOG`, defaulting to "info".
pub fn init(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("log path {} has no file name", path.display()))?;
    let directory = path.parent().unwrap_or_else(|| Path::new("."));

    let appender = tracing_appender::rolling::never(directory, file_name);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(appender)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("install tracing subscriber: {err}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_creates_the_log_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("redterm.log");
        // A second test in the process may already have installed a
        // subscriber; directory creation must happen either way.
        let _ = init(&path);
        assert!(path.parent().unwrap().is_dir());
    }
}
