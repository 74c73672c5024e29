//! One-shot temp files directly under the system temp directory.
//!
//! These helpers share no state with any [`TempScope`](crate::TempScope): each call
//! picks a fresh name, opens it once and hands the handle over. Nothing tracks the
//! file afterwards, so a kept file is the caller's to delete.

use crate::error::{IoResultExt, Result};
use crate::naming::{self, DEFAULT_EXTENSION};
use crate::stream::{TempFileStream, default_open};
use std::io;
use std::path::Path;

/// Creates `<random>.tmp` in the system temp directory.
///
/// The file is removed when the returned handle is dropped unless `keep_file` is set.
///
/// # Errors
/// Returns [`TempScopeError::Open`](crate::TempScopeError::Open) if the file
/// cannot be created.
pub fn create(keep_file: bool) -> Result<TempFileStream> {
    create_with_extension(DEFAULT_EXTENSION, keep_file)
}

/// Creates `<random><extension>` in the system temp directory.
///
/// # Errors
/// Returns an invalid-argument error for an empty extension, or an open error.
pub fn create_with_extension(extension: &str, keep_file: bool) -> Result<TempFileStream> {
    create_with_extension_using(default_open, extension, keep_file)
}

/// Like [`create`], but `opener` performs the open.
///
/// # Errors
/// Returns [`TempScopeError::Open`](crate::TempScopeError::Open) with the opener's error.
pub fn create_with<S, F>(opener: F, keep_file: bool) -> Result<S>
where
    F: FnOnce(&Path, bool) -> io::Result<S>,
{
    create_with_extension_using(opener, DEFAULT_EXTENSION, keep_file)
}

/// Like [`create_with_extension`], but `opener` performs the open. It receives the
/// chosen path and `keep_file`, and decides itself whether to delete on close.
///
/// # Errors
/// Returns an invalid-argument error for an empty extension, or an open error.
pub fn create_with_extension_using<S, F>(opener: F, extension: &str, keep_file: bool) -> Result<S>
where
    F: FnOnce(&Path, bool) -> io::Result<S>,
{
    let path = naming::join_unique(&std::env::temp_dir(), extension)?;
    opener(&path, keep_file).open(format!("Failed to open ad-hoc temp file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TempScopeError;
    use std::io::Write;

    #[test]
    fn lands_in_system_temp_dir() {
        let stream = create(false).unwrap();
        assert_eq!(stream.path().parent(), Some(std::env::temp_dir().as_path()));
        assert!(stream.path().to_string_lossy().ends_with(".tmp"));
    }

    #[test]
    fn released_handle_removes_file() {
        let mut stream = create(false).unwrap();
        stream.write_all(b"transient").unwrap();
        let path = stream.path().to_path_buf();
        assert!(path.exists());

        drop(stream);

        assert!(!path.exists());
    }

    #[test]
    fn kept_file_survives_release() {
        let stream = create_with_extension(".keep", true).unwrap();
        let path = stream.path().to_path_buf();
        drop(stream);

        assert!(path.exists());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn opener_sees_keep_flag_and_extension() {
        let (path, keep) =
            create_with_extension_using(|p, keep| Ok((p.to_path_buf(), keep)), ".json", true)
                .unwrap();
        assert!(keep);
        assert!(path.to_string_lossy().ends_with(".json"));
        assert!(!path.exists(), "custom opener did not create anything");

        let keep = create_with(|_, keep| Ok(keep), false).unwrap();
        assert!(!keep);
    }

    #[test]
    fn empty_extension_rejected() {
        let err = create_with_extension("", false).unwrap_err();
        assert!(matches!(err, TempScopeError::InvalidArgument { .. }));
    }
}
