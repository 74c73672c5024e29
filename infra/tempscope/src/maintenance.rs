use crate::naming::{is_live, parse_scope_tick};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

/// Removes sibling scope directories left behind by earlier runs.
///
/// Only direct children of `parent` named `<prefix><digits>` and untouched for longer
/// than `threshold` are considered. Directories owned by a live scope of this process
/// are skipped. Scopes held by *other* processes with the same prefix are not protected:
/// an idle one older than `threshold` is removed like any leftover.
///
/// Everything is best-effort: failures are logged, never returned.
pub(crate) fn purge_stale(parent: &Path, prefix: &str, threshold: Duration) {
    if prefix.is_empty() {
        return;
    }

    let (removed, failed) = remove_stale(parent, prefix, SystemTime::now(), threshold);
    if removed > 0 || failed > 0 {
        info!(parent = %parent.display(), removed, failed, "Purged stale temp scopes");
    }
}

fn remove_stale(
    parent: &Path,
    prefix: &str,
    now: SystemTime,
    threshold: Duration,
) -> (usize, usize) {
    let mut removed = 0;
    let mut failed = 0;

    WalkDir::new(parent)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .flatten()
        .filter(|entry| is_scope_dir(entry, prefix) && is_stale(entry, now, threshold))
        .filter(|entry| !is_live(entry.path()))
        .for_each(|entry| match std::fs::remove_dir_all(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Stale scope removal failed");
                failed += 1;
            },
        });

    (removed, failed)
}

fn is_scope_dir(entry: &DirEntry, prefix: &str) -> bool {
    entry.file_type().is_dir()
        && entry.file_name().to_str().and_then(|name| parse_scope_tick(prefix, name)).is_some()
}

fn is_stale(entry: &DirEntry, now: SystemTime, threshold: Duration) -> bool {
    entry
        .metadata()
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|modified| now.duration_since(modified).ok())
        .is_some_and(|age| age > threshold)
}
