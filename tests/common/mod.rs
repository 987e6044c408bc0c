#![allow(dead_code)]

use plaintrack::storage::{FsStore, WorkingArea};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Instant;
use tempfile::TempDir;
use tracing::info;

pub mod cli;
pub mod fixtures;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        plaintrack::logging::init_test_logging();
    });
}

pub struct TestLogGuard {
    name: String,
    start: Instant,
}

impl TestLogGuard {
    fn new(name: &str) -> Self {
        init_test_logging();
        info!("{name}: starting");
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for TestLogGuard {
    fn drop(&mut self) {
        info!(
            "{}: assertions passed (elapsed {:?})",
            self.name,
            self.start.elapsed()
        );
    }
}

pub fn test_log(name: &str) -> TestLogGuard {
    TestLogGuard::new(name)
}

/// A `.plaintrack` working area inside a temp directory.
pub struct TestArea {
    pub temp_dir: TempDir,
    pub dir: PathBuf,
    pub store: FsStore,
    pub area: WorkingArea,
}

impl TestArea {
    pub fn new() -> Self {
        init_test_logging();
        let temp_dir = TempDir::new().expect("temp dir");
        let dir = temp_dir.path().join(".plaintrack");
        fs::create_dir_all(&dir).expect("tracker dir");
        let store = FsStore::new(&dir);
        let area = WorkingArea::in_dir(&dir);
        Self {
            temp_dir,
            dir,
            store,
            area,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn write(&self, name: &str, lines: &[String]) {
        let mut text = lines.join("\n");
        text.push('\n');
        fs::write(self.path(name), text).expect("write container");
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).unwrap_or_default()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }
}
