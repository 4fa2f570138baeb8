//! Diagnostic log file setup.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::filter::LevelFilter;

use crate::infra::config::Logging;

/// Install the global subscriber appending to the configured log file.
///
/// Does nothing when logging is disabled. An unopenable log file is an error so the caller can
/// abort before touching the document.
pub fn init(settings: &Logging) -> Result<()> {
    if !settings.enabled() {
        return Ok(());
    }

    let level = parse_level(&settings.level())?;
    let file = open_append(&settings.file())?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_max_level(level)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;

    let started_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("failed to format run timestamp")?;
    tracing::info!(started_at = %started_at, "--- clonify: convert copies to clones ---");
    Ok(())
}

fn parse_level(level: &str) -> Result<LevelFilter> {
    LevelFilter::from_str(level.trim()).map_err(|err| anyhow!("invalid log level '{level}': {err}"))
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory: {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level(" WARN ").unwrap(), LevelFilter::WARN);
        assert!(parse_level("chatty").is_err());
    }

    #[test]
    fn disabled_logging_installs_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let mut settings = Logging::default();
        settings.set_file(temp.path().join("log.txt"));
        settings.set_enabled(false);

        init(&settings).unwrap();
        assert!(!temp.path().join("log.txt").exists());
    }

    #[test]
    fn open_append_creates_parent_directories() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested/dir/log.txt");
        open_append(&path).unwrap();
        assert!(path.exists());
    }
}
