//! Storage backend for item tables and their inputs.
//!
//! Every file the toolkit touches goes through this module: input lists
//! (CSV / JSON), GeoParquet outputs, and tables read back for validation.
//! Paths are always resolved as `location` + relative path so a future object
//! store backend only has to add a [`StorageLocation`] variant.
//!
//! Writes are whole-file and atomic: bytes land in a sibling temp file which
//! is synced and renamed over the target. A failed write never leaves a
//! partial table behind.

use std::{
    error::Error,
    fmt, io,
    path::{Path, PathBuf},
};

use snafu::{Backtrace, prelude::*};
use tokio::{fs, io::AsyncWriteExt};

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Root that relative paths are resolved against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageLocation {
    /// A directory on the local filesystem.
    Local(PathBuf),
}

impl StorageLocation {
    /// Creates a local location rooted at `root`.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        StorageLocation::Local(root.into())
    }

    /// Split a single file path into its parent directory location and the
    /// file name relative to it.
    ///
    /// A bare file name resolves against the current directory (`.`).
    pub fn for_file(path: &Path) -> (Self, PathBuf) {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let rel = path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf());
        (StorageLocation::Local(parent), rel)
    }
}

/// Errors produced by the backend itself, before path context is attached.
#[derive(Debug)]
pub enum BackendError {
    /// A local filesystem I/O error.
    Local(io::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Local(e) => write!(f, "local I/O error: {e}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BackendError::Local(e) => Some(e),
        }
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    /// The requested file does not exist.
    #[snafu(display("Path not found: {path}"))]
    NotFound {
        /// Absolute path that was looked up.
        path: String,
        /// Underlying backend error.
        source: BackendError,
        /// Backtrace captured at the failure.
        backtrace: Backtrace,
    },

    /// Any other I/O failure (permissions, full disk, rename failure, ...).
    #[snafu(display("Local I/O error at {path}: {source}"))]
    OtherIo {
        /// Path the failing operation was acting on.
        path: String,
        /// Underlying backend error.
        source: BackendError,
        /// Backtrace captured at the failure.
        backtrace: Backtrace,
    },
}

fn join_local(location: &StorageLocation, rel: &Path) -> PathBuf {
    match location {
        StorageLocation::Local(root) => root.join(rel),
    }
}

async fn create_parent_dir(abs: &Path) -> StorageResult<()> {
    if let Some(parent) = abs.parent() {
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(parent)
            .await
            .map_err(BackendError::Local)
            .context(OtherIoSnafu {
                path: parent.display().to_string(),
            })?;
    }
    Ok(())
}

/// Removes a temp file on drop unless disarmed after a successful rename.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            // Already on an error path; a leftover temp file is the lesser problem.
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn temp_sibling(abs: &Path) -> PathBuf {
    let mut name = abs
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    abs.with_file_name(name)
}

/// Write `contents` to `rel_path` under `location`, replacing any existing
/// file atomically.
///
/// The payload is written to `<name>.tmp` next to the target, synced, then
/// renamed into place. Parent directories are created as needed.
pub async fn write_atomic(
    location: &StorageLocation,
    rel_path: &Path,
    contents: &[u8],
) -> StorageResult<()> {
    match location {
        StorageLocation::Local(_) => {
            let abs = join_local(location, rel_path);
            create_parent_dir(&abs).await?;

            let tmp_path = temp_sibling(&abs);
            let mut guard = TempFileGuard::new(tmp_path.clone());

            {
                let mut file = fs::File::create(&tmp_path)
                    .await
                    .map_err(BackendError::Local)
                    .context(OtherIoSnafu {
                        path: tmp_path.display().to_string(),
                    })?;

                file.write_all(contents)
                    .await
                    .map_err(BackendError::Local)
                    .context(OtherIoSnafu {
                        path: tmp_path.display().to_string(),
                    })?;

                file.sync_all()
                    .await
                    .map_err(BackendError::Local)
                    .context(OtherIoSnafu {
                        path: tmp_path.display().to_string(),
                    })?;
            }

            fs::rename(&tmp_path, &abs)
                .await
                .map_err(BackendError::Local)
                .context(OtherIoSnafu {
                    path: abs.display().to_string(),
                })?;

            guard.disarm();
            Ok(())
        }
    }
}

/// Read the whole file at `rel_path` under `location`.
///
/// A missing file maps to [`StorageError::NotFound`]; everything else to
/// [`StorageError::OtherIo`].
pub async fn read_all_bytes(location: &StorageLocation, rel_path: &Path) -> StorageResult<Vec<u8>> {
    match location {
        StorageLocation::Local(_) => {
            let abs = join_local(location, rel_path);
            let path_str = abs.display().to_string();

            match fs::read(&abs).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(BackendError::Local(e)).context(NotFoundSnafu { path: path_str })
                }
                Err(e) => Err(BackendError::Local(e)).context(OtherIoSnafu { path: path_str }),
            }
        }
    }
}
