//! The scope manager: one private directory, uniquely named files inside it, and
//! best-effort removal of the whole tree when the scope ends.
//!
//! A [`TempScope`] is `Live` from the moment [`TempScopeBuilder::create`] returns
//! until it is dropped. [`TempScope::clear`] passes through a transient cleared
//! state and comes back `Live` with an empty directory and registry.

use crate::builder::TempScopeBuilder;
use crate::error::{IoResultExt, Result};
use crate::naming;
use crate::stream::{TempFileStream, default_open};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Owner of a private temporary directory.
///
/// Every name it hands out lives directly under [`base_dir`](Self::base_dir). When
/// recording is on, issued paths are appended to an ordered registry; the registry
/// only ever holds paths, never open handles.
///
/// Registry-mutating operations take `&mut self`: a scope is meant for a single
/// owner, and sharing it across threads requires the caller's own lock.
///
/// Dropping the scope removes the directory tree. Removal is advisory: if a file
/// is locked or permissions forbid it, the tree may partially survive and no error
/// is reported.
///
/// # Example
///
/// ```rust
/// use mhub_tempscope::TempScope;
///
/// # fn main() -> Result<(), mhub_tempscope::TempScopeError> {
/// # let tmp = tempfile::tempdir().unwrap();
/// let mut scope = TempScope::new_in_with_tracking(tmp.path(), true)?;
///
/// let report = scope.temp_file_name_with(".txt")?;
/// std::fs::write(&report, b"draft").unwrap();
/// assert_eq!(scope.issued_names(), [report.clone()]);
///
/// scope.clear()?;
/// assert!(!report.exists());
/// assert!(scope.issued_names().is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TempScope {
    base_dir: PathBuf,
    store_names: bool,
    extension: String,
    issued: Vec<PathBuf>,
    live_key: PathBuf,
    armed: bool,
}

impl TempScope {
    #[must_use = "The scope is not created until you call .create()"]
    pub fn builder() -> TempScopeBuilder {
        TempScopeBuilder::new()
    }

    /// Creates a scope under the system temp directory without recording names.
    ///
    /// # Errors
    /// Returns [`TempScopeError::Construction`](crate::TempScopeError::Construction)
    /// if the directory cannot be created.
    pub fn new() -> Result<Self> {
        Self::builder().create()
    }

    /// Creates a scope under `parent` without recording names.
    ///
    /// # Errors
    /// Returns [`TempScopeError::InvalidArgument`](crate::TempScopeError::InvalidArgument)
    /// for an empty `parent`, or a construction error if the directory cannot be created.
    pub fn new_in(parent: impl AsRef<Path>) -> Result<Self> {
        Self::builder().parent(parent.as_ref()).create()
    }

    /// Creates a scope under the system temp directory with the given recording default.
    ///
    /// # Errors
    /// Returns a construction error if the directory cannot be created.
    pub fn with_tracking(store_names: bool) -> Result<Self> {
        Self::builder().store_names(store_names).create()
    }

    /// Creates a scope under `parent` with the given recording default.
    ///
    /// # Errors
    /// Same as [`TempScope::new_in`].
    pub fn new_in_with_tracking(parent: impl AsRef<Path>, store_names: bool) -> Result<Self> {
        Self::builder().parent(parent.as_ref()).store_names(store_names).create()
    }

    pub(crate) fn from_parts(base_dir: PathBuf, store_names: bool, extension: String) -> Self {
        let live_key = naming::register_live(&base_dir);
        Self { base_dir, store_names, extension, issued: Vec::new(), live_key, armed: true }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Default recording policy for names issued without an explicit choice.
    #[must_use]
    pub const fn store_names(&self) -> bool {
        self.store_names
    }

    /// Extension used by [`temp_file_name`](Self::temp_file_name) and
    /// [`temp_file_stream`](Self::temp_file_stream).
    #[must_use]
    pub fn default_extension(&self) -> &str {
        &self.extension
    }

    /// Recorded names in issue order. Empty when nothing was recorded.
    #[must_use]
    pub fn issued_names(&self) -> &[PathBuf] {
        &self.issued
    }

    /// Whether `path` lies under this scope's directory (lexically).
    #[must_use]
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        naming::is_within(&self.base_dir, path.as_ref())
    }

    /// Starts a request for a single file with per-call overrides.
    pub fn file(&mut self) -> FileRequest<'_> {
        let store = self.store_names;
        let extension = self.extension.clone();
        FileRequest { scope: self, extension, store, keep: false }
    }

    /// Issues a fresh path with the default extension. Nothing is created on disk.
    ///
    /// # Errors
    /// Returns an invalid-argument error only if the default extension is rejected.
    pub fn temp_file_name(&mut self) -> Result<PathBuf> {
        self.file().name()
    }

    /// Issues a fresh path ending in `extension`. Nothing is created on disk.
    ///
    /// # Errors
    /// Returns [`TempScopeError::InvalidArgument`](crate::TempScopeError::InvalidArgument)
    /// if `extension` is empty or contains a path separator.
    pub fn temp_file_name_with(&mut self, extension: &str) -> Result<PathBuf> {
        self.file().extension(extension).name()
    }

    /// Creates and opens a self-deleting scratch file with the default extension.
    ///
    /// # Errors
    /// Returns [`TempScopeError::Open`](crate::TempScopeError::Open) if the file
    /// cannot be created.
    pub fn temp_file_stream(&mut self) -> Result<TempFileStream> {
        self.file().open()
    }

    /// Creates and opens a self-deleting scratch file ending in `extension`.
    ///
    /// # Errors
    /// Returns an invalid-argument error for a bad extension, or an open error.
    pub fn temp_file_stream_with(&mut self, extension: &str) -> Result<TempFileStream> {
        self.file().extension(extension).open()
    }

    /// Empties the registry, deletes the directory tree and recreates the directory.
    ///
    /// Deletion is best-effort and its failure is not reported. Recreating the
    /// directory is not: a scope that cannot restore its directory is unusable.
    ///
    /// # Errors
    /// Returns [`TempScopeError::Construction`](crate::TempScopeError::Construction)
    /// if the directory cannot be recreated.
    pub fn clear(&mut self) -> Result<()> {
        self.issued.clear();

        if let Err(err) = self.safe_delete() {
            warn!(path = %self.base_dir.display(), error = %err, "Temp scope clear left files behind");
        }

        std::fs::create_dir_all(&self.base_dir)
            .construction(format!("Failed to recreate scope: {}", self.base_dir.display()))?;

        debug!(path = %self.base_dir.display(), "Temp scope cleared");
        Ok(())
    }

    /// Ends the scope without deleting it and returns the directory path.
    ///
    /// The kept directory is no longer shielded from a stale sweep.
    #[must_use = "The kept directory is no longer removed automatically"]
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.base_dir)
    }

    fn record(&mut self, path: &Path, store: bool) {
        if store {
            self.issued.push(path.to_path_buf());
        }
    }

    fn safe_delete(&self) -> io::Result<()> {
        match std::fs::remove_dir_all(&self.base_dir) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

impl Drop for TempScope {
    fn drop(&mut self) {
        naming::release_live(&self.live_key);
        if !self.armed {
            return;
        }
        match self.safe_delete() {
            Ok(()) => debug!(path = %self.base_dir.display(), "Temp scope removed"),
            Err(err) => {
                warn!(path = %self.base_dir.display(), error = %err, "Temp scope teardown failed");
            },
        }
    }
}

/// A single file request against a [`TempScope`].
///
/// Starts from the scope's defaults; every setter overrides one of them for this
/// call only.
///
/// ```rust
/// # use mhub_tempscope::TempScope;
/// # use std::io::Write;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let tmp = tempfile::tempdir()?;
/// let mut scope = TempScope::new_in(tmp.path())?;
///
/// let mut out = scope
///     .file()
///     .extension(".csv")
///     .store(true)
///     .keep(true)
///     .open_with(|path, keep| {
///         mhub_tempscope::default_open(path, keep).map(std::io::BufWriter::new)
///     })?;
/// out.write_all(b"a,b\n")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileRequest<'a> {
    scope: &'a mut TempScope,
    extension: String,
    store: bool,
    keep: bool,
}

impl FileRequest<'_> {
    #[must_use = "Sets the file extension for this request"]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Overrides the scope's recording default.
    #[must_use = "Sets whether the issued name is recorded"]
    pub const fn store(mut self, store: bool) -> Self {
        self.store = store;
        self
    }

    /// Keeps the file on disk after its handle is released (until the scope ends).
    #[must_use = "Sets whether the opened file survives its handle"]
    pub const fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    /// Issues the path without touching the filesystem.
    ///
    /// # Errors
    /// Returns an invalid-argument error for a bad extension.
    pub fn name(self) -> Result<PathBuf> {
        let path = naming::join_unique(&self.scope.base_dir, &self.extension)?;
        self.scope.record(&path, self.store);
        debug!(path = %path.display(), store = self.store, "Temp file name issued");
        Ok(path)
    }

    /// Issues a path and opens it with the default policy.
    ///
    /// # Errors
    /// Returns an invalid-argument error for a bad extension, or an open error.
    pub fn open(self) -> Result<TempFileStream> {
        self.open_with(default_open)
    }

    /// Issues a path and delegates opening to `opener`, which receives the path and
    /// the keep flag.
    ///
    /// The name is recorded (when requested) before opening, so a failed open still
    /// leaves its path in the registry.
    ///
    /// # Errors
    /// Returns an invalid-argument error for a bad extension, or
    /// [`TempScopeError::Open`](crate::TempScopeError::Open) with the opener's error.
    pub fn open_with<S, F>(self, opener: F) -> Result<S>
    where
        F: FnOnce(&Path, bool) -> io::Result<S>,
    {
        let keep = self.keep;
        let path = self.name()?;
        opener(&path, keep).open(format!("Failed to open temp file: {}", path.display()))
    }
}
