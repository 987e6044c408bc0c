//! Tracing setup for the `pt` binary and the test suites.
//!
//! Events go to stderr so `--json` output on stdout stays parseable.
//! `--log-file` adds a JSON-lines copy of every event. The file is appended
//! to across runs, so a sequence of merges can be audited afterwards.

use std::fs::{self, File, OpenOptions};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::{Mutex, Once};

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Target prefix shared by every event the library emits.
const TARGET: &str = "plaintrack";

/// Install the global subscriber for one `pt` invocation.
///
/// `RUST_LOG` wins when set; otherwise the level follows `-v` / `-q`.
///
/// # Errors
///
/// Returns an error if the filter is invalid, the log file cannot be opened,
/// or a global subscriber is already installed.
pub fn init_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbosity, quiet)))?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .with_ansi(std::io::stderr().is_terminal());

    let file_layer = log_file
        .map(open_log_file)
        .transpose()?
        .map(|file| fmt::layer().with_writer(Mutex::new(file)).with_ansi(false).json());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(())
}

/// Level for the library's own events at a given `-v` count.
#[must_use]
pub fn verbosity_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn default_filter(verbosity: u8, quiet: bool) -> String {
    let level = verbosity_level(verbosity, quiet).to_string().to_lowercase();
    if quiet {
        // Dependencies stay silent too.
        level
    } else {
        format!("{TARGET}={level}")
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

/// Route library events to the test harness output, once per process.
pub fn init_test_logging() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(format!("{TARGET}=debug"))
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn quiet_overrides_verbosity() {
        assert_eq!(verbosity_level(3, true), LevelFilter::ERROR);
        assert_eq!(default_filter(3, true), "error");
    }

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(verbosity_level(0, false), LevelFilter::WARN);
        assert_eq!(verbosity_level(1, false), LevelFilter::INFO);
        assert_eq!(default_filter(2, false), "plaintrack=debug");
        assert_eq!(default_filter(9, false), "plaintrack=trace");
    }

    #[test]
    fn log_file_is_appended_and_parent_created() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logs").join("pt.jsonl");

        open_log_file(&path).unwrap().write_all(b"first\n").unwrap();
        open_log_file(&path).unwrap().write_all(b"second\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
