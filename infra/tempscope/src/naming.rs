//! Naming primitives shared by scopes and ad-hoc files.
//!
//! The process-scoped naming prefix lives here. It is a plain mutable value: set it
//! before the first [`TempScope`](crate::TempScope) is built if directory names must
//! be reproducible, since every subsequent construction reads whatever is current.

use crate::error::{Result, TempScopeError};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Extension used when the caller does not pick one.
pub const DEFAULT_EXTENSION: &str = ".tmp";

/// Length of generated file ids. 25 symbols of a 36-symbol alphabet is ~129 bits.
pub const UNIQUE_ID_LEN: usize = 25;

// Lowercase only, so ids stay distinct on case-insensitive filesystems.
const ID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

const FALLBACK_PROCESS_NAME: &str = "process";

static NAMING_PREFIX: RwLock<Option<String>> = RwLock::new(None);
static LAST_TICK: AtomicU64 = AtomicU64::new(0);
static LIVE_SCOPES: Mutex<BTreeSet<PathBuf>> = Mutex::new(BTreeSet::new());

/// Returns the process-scoped naming prefix.
///
/// Resolves lazily to the entry process name followed by `_` until
/// [`set_naming_prefix`] overrides it.
#[must_use]
pub fn naming_prefix() -> String {
    if let Some(prefix) = NAMING_PREFIX.read().as_ref() {
        return prefix.clone();
    }
    let mut slot = NAMING_PREFIX.write();
    slot.get_or_insert_with(|| format!("{}_", process_name())).clone()
}

/// Overrides the process-scoped naming prefix for every scope constructed afterwards.
///
/// # Errors
/// Returns [`TempScopeError::InvalidArgument`] if the prefix could escape the parent
/// directory (path separators, `.`/`..`, NUL).
pub fn set_naming_prefix(prefix: impl Into<String>) -> Result<()> {
    let prefix = prefix.into();
    validate_prefix(&prefix)?;
    *NAMING_PREFIX.write() = Some(prefix);
    Ok(())
}

/// Drops any override so the next read resolves the process-name default again.
pub fn reset_naming_prefix() {
    *NAMING_PREFIX.write() = None;
}

/// Display name of the running executable, without extension.
pub(crate) fn process_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .or_else(|| {
            std::env::args_os().next().and_then(|arg| {
                Path::new(&arg).file_stem().map(|s| s.to_string_lossy().into_owned())
            })
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_PROCESS_NAME.to_owned())
}

/// Monotonic tick used in scope directory names.
///
/// Milliseconds since the Unix epoch, bumped so that no two calls in this process
/// ever observe the same value.
pub(crate) fn next_tick() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));

    let mut last = LAST_TICK.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_TICK.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Collision-resistant file id. Uniqueness is assumed, never checked.
#[must_use]
pub fn unique_id() -> String {
    nanoid::nanoid!(UNIQUE_ID_LEN, &ID_ALPHABET)
}

/// Builds `<id><extension>` after validating the extension.
pub(crate) fn file_name(extension: &str) -> Result<String> {
    validate_extension(extension)?;
    Ok(format!("{}{extension}", unique_id()))
}

pub(crate) fn scope_dir_name(prefix: &str, tick: u64) -> String {
    format!("{prefix}{tick}")
}

/// Parses the tick back out of a directory name built by [`scope_dir_name`].
pub(crate) fn parse_scope_tick(prefix: &str, name: &str) -> Option<u64> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub(crate) fn validate_extension(extension: &str) -> Result<()> {
    if extension.is_empty() {
        return Err(TempScopeError::invalid("extension", "Extension must not be empty"));
    }
    if extension.contains(['/', '\\', '\0']) {
        return Err(TempScopeError::invalid(
            extension.to_owned(),
            "Extension must not contain path separators or NUL",
        ));
    }
    Ok(())
}

pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.contains(['/', '\\', '\0']) || prefix == "." || prefix == ".." {
        return Err(TempScopeError::invalid(
            prefix.to_owned(),
            "Naming prefix must be a plain file-name fragment",
        ));
    }
    Ok(())
}

pub(crate) fn validate_parent(parent: &Path) -> Result<()> {
    if parent.as_os_str().is_empty() {
        return Err(TempScopeError::invalid("parent", "Parent directory must not be empty"));
    }
    Ok(())
}

/// Lexical containment check; `..` components are rejected rather than resolved.
pub(crate) fn is_within(base: &Path, path: &Path) -> bool {
    path.starts_with(base)
        && path.strip_prefix(base).is_ok_and(|rel| {
            rel.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        })
}

// Canonical where possible, so differently spelled parents still compare equal.
fn live_key(dir: &Path) -> PathBuf {
    std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

/// Marks `dir` as owned by a scope of this process and returns the key to release it with.
pub(crate) fn register_live(dir: &Path) -> PathBuf {
    let key = live_key(dir);
    LIVE_SCOPES.lock().insert(key.clone());
    key
}

pub(crate) fn release_live(key: &Path) {
    LIVE_SCOPES.lock().remove(key);
}

/// Whether a scope of this process still owns `dir`.
pub(crate) fn is_live(dir: &Path) -> bool {
    LIVE_SCOPES.lock().contains(&live_key(dir))
}

pub(crate) fn join_unique(dir: &Path, extension: &str) -> Result<PathBuf> {
    Ok(dir.join(file_name(extension)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashSet;

    #[test]
    fn ticks_strictly_increase() {
        let ticks: Vec<u64> = (0..1_000).map(|_| next_tick()).collect();
        assert!(ticks.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn unique_ids_use_lowercase_alphabet() {
        let ids: HashSet<String> = (0..1_000).map(|_| unique_id()).collect();
        assert_eq!(ids.len(), 1_000);
        for id in &ids {
            assert_eq!(id.len(), UNIQUE_ID_LEN);
            assert!(id.chars().all(|c| ID_ALPHABET.contains(&c)), "unexpected id: {id}");
        }
    }

    #[test]
    fn extension_rules() {
        assert!(validate_extension(".txt").is_ok());
        assert!(validate_extension("log").is_ok());
        assert!(validate_extension("").is_err());
        assert!(validate_extension("/../x").is_err());
        assert!(validate_extension("a\\b").is_err());
    }

    #[test]
    fn scope_tick_parsing() {
        assert_eq!(parse_scope_tick("app_", "app_123"), Some(123));
        assert_eq!(parse_scope_tick("app_", "app_"), None);
        assert_eq!(parse_scope_tick("app_", "app_12x"), None);
        assert_eq!(parse_scope_tick("app_", "other_12"), None);
        assert_eq!(parse_scope_tick("", "42"), Some(42));
    }

    #[test]
    fn containment_is_lexical() {
        let base = Path::new("/tmp/scope_1");
        assert!(is_within(base, Path::new("/tmp/scope_1/a.tmp")));
        assert!(!is_within(base, Path::new("/tmp/scope_1/../etc/passwd")));
        assert!(!is_within(base, Path::new("/tmp/scope_10/a.tmp")));
    }

    #[test]
    fn live_registry_tracks_ownership() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("live_1");
        std::fs::create_dir(&dir).unwrap();

        assert!(!is_live(&dir));
        let key = register_live(&dir);
        assert!(is_live(&dir));
        assert!(is_live(&root.path().join(".").join("live_1")));

        release_live(&key);
        assert!(!is_live(&dir));
    }

    #[test]
    #[serial]
    fn prefix_defaults_to_process_name() {
        reset_naming_prefix();
        let prefix = naming_prefix();
        assert!(prefix.ends_with('_'));
        assert_eq!(prefix, format!("{}_", process_name()));
    }

    #[test]
    #[serial]
    fn prefix_override_and_reset() {
        set_naming_prefix("unit_").expect("valid prefix");
        assert_eq!(naming_prefix(), "unit_");
        assert!(set_naming_prefix("../evil").is_err());
        assert_eq!(naming_prefix(), "unit_");
        reset_naming_prefix();
        assert_ne!(naming_prefix(), "unit_");
    }
}
