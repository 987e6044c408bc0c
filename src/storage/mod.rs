//! Container storage boundary.
//!
//! The merge, diff, ledger and migration engines only talk to a
//! [`ContainerStore`]; they never assume a particular filesystem layout.
//! [`FsStore`] is the on-disk implementation: one directory of `*.jsonl`
//! containers, written with temp-file-then-rename so a partially written
//! container is never left in place.

use crate::error::{Result, TrackError};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Extension of record containers.
pub const CONTAINER_EXTENSION: &str = "jsonl";
/// Extension of in-flight atomic writes.
const TEMP_EXTENSION: &str = "jsonl.tmp";

/// Narrow file-access contract consumed by the engines.
pub trait ContainerStore {
    /// All containers of the working area, in deterministic (sorted) order.
    ///
    /// # Errors
    ///
    /// Returns an error if the working area cannot be listed.
    fn list_containers(&self) -> Result<Vec<PathBuf>>;

    /// Full text of a container. A missing container reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the container exists but cannot be read.
    fn read_container(&self, path: &Path) -> Result<String>;

    /// Replace a container's contents atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be written or renamed.
    fn write_container_atomically(&self, path: &Path, text: &str) -> Result<()>;

    /// Remove a container. Removing a missing container is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the container exists but cannot be removed.
    fn delete_container(&self, path: &Path) -> Result<()>;
}

/// Filesystem-backed store rooted at one working-area directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a container name relative to the root.
    #[must_use]
    pub fn container_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

fn is_container(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == CONTAINER_EXTENSION)
}

impl ContainerStore for FsStore {
    fn list_containers(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(TrackError::storage(&self.root, e)),
        };

        let mut containers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TrackError::storage(&self.root, e))?;
            let path = entry.path();
            if path.is_file() && is_container(&path) {
                containers.push(path);
            }
        }
        containers.sort();

        tracing::trace!(
            root = %self.root.display(),
            count = containers.len(),
            "Listed containers"
        );
        Ok(containers)
    }

    fn read_container(&self, path: &Path) -> Result<String> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(TrackError::storage(path, e)),
        }
    }

    fn write_container_atomically(&self, path: &Path, text: &str) -> Result<()> {
        let parent = path.parent().ok_or_else(|| {
            TrackError::Config(format!("Invalid container path: {}", path.display()))
        })?;
        fs::create_dir_all(parent).map_err(|e| TrackError::storage(parent, e))?;

        // Temp file must live next to the target so the rename stays on one filesystem.
        let temp_path = path.with_extension(TEMP_EXTENSION);
        let write = || -> std::io::Result<()> {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(text.as_bytes())?;
            writer.flush()?;
            writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
            fs::rename(&temp_path, path)
        };

        if let Err(e) = write() {
            let _ = fs::remove_file(&temp_path);
            return Err(TrackError::storage(path, e));
        }

        tracing::debug!(
            path = %path.display(),
            bytes = text.len(),
            "Container written"
        );
        Ok(())
    }

    fn delete_container(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Container removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TrackError::storage(path, e)),
        }
    }
}

/// Roles of the containers in one working area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingArea {
    /// Canonical container duplicates converge into.
    pub primary: PathBuf,
    /// Conflict ledger container.
    pub ledger: PathBuf,
}

impl WorkingArea {
    #[must_use]
    pub fn new(primary: impl Into<PathBuf>, ledger: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            ledger: ledger.into(),
        }
    }

    /// Working area using the default container names under `root`.
    #[must_use]
    pub fn in_dir(root: &Path) -> Self {
        Self::new(
            root.join(crate::config::DEFAULT_PRIMARY),
            root.join(crate::config::DEFAULT_LEDGER),
        )
    }

    /// Non-primary, non-ledger containers in enumeration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed.
    pub fn pending_containers(&self, store: &impl ContainerStore) -> Result<Vec<PathBuf>> {
        Ok(store
            .list_containers()?
            .into_iter()
            .filter(|path| path != &self.primary && path != &self.ledger)
            .collect())
    }

    /// Every issue container: the primary first, then the pending ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed.
    pub fn issue_containers(&self, store: &impl ContainerStore) -> Result<Vec<PathBuf>> {
        let mut containers = vec![self.primary.clone()];
        containers.extend(self.pending_containers(store)?);
        Ok(containers)
    }
}

/// Display name of a container (its file name).
#[must_use]
pub fn container_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().to_string(),
    )
}
