//! Exclusive read/write handles over freshly created temp files.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[cfg(windows)]
const FILE_FLAG_DELETE_ON_CLOSE: u32 = 0x0400_0000;

/// An open temp file that may remove itself when released.
///
/// On Windows the delete-on-close request is handed to the OS. Elsewhere the
/// handle unlinks its own path on drop, which leaves the open descriptor usable
/// until then.
#[derive(Debug)]
pub struct TempFileStream {
    file: File,
    path: PathBuf,
    delete_on_close: bool,
}

impl TempFileStream {
    /// Path the file was created at.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file disappears once this handle is dropped.
    #[must_use]
    pub const fn deletes_on_close(&self) -> bool {
        self.delete_on_close
    }

    #[must_use]
    pub const fn as_file(&self) -> &File {
        &self.file
    }

    pub fn as_file_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

/// Default open policy: create-new, read+write, exclusive, delete-on-close unless `keep_file`.
///
/// Exposed so custom openers can wrap it, e.g. `|p, keep| default_open(p, keep).map(BufWriter::new)`.
///
/// # Errors
/// Propagates the underlying open failure unchanged.
pub fn default_open(path: &Path, keep_file: bool) -> io::Result<TempFileStream> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create_new(true);

    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        options.share_mode(0);
        if !keep_file {
            options.custom_flags(FILE_FLAG_DELETE_ON_CLOSE);
        }
    }

    let file = options.open(path)?;
    debug!(path = %path.display(), keep_file, "Temp file opened");

    Ok(TempFileStream { file, path: path.to_path_buf(), delete_on_close: !keep_file })
}

impl Drop for TempFileStream {
    fn drop(&mut self) {
        if !self.delete_on_close || cfg!(windows) {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Temp file removed on close"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {},
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Temp file removal on close failed");
            },
        }
    }
}

impl Read for TempFileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for TempFileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for TempFileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
