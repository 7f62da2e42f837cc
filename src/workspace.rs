//! Scratch directories for working copies.
//!
//! Each clone-based write gets its own `wc-XXXXXX` directory under the scratch
//! root, removed when the [`ScratchDir`] is dropped. Directories left behind by
//! a crashed process are swept on the next acquisition.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tracing::{debug, warn};

const PREFIX: &str = "wc-";

/// Leftovers younger than this may still belong to a live request in another process.
pub const STALE_AFTER: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a fresh, empty, uniquely named directory under `root`.
    pub fn acquire(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("create scratch root: {}", root.display()))?;
        sweep_stale(root, STALE_AFTER);
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir_in(root)
            .with_context(|| format!("create scratch dir in {}", root.display()))?;
        debug!(path = %dir.path().display(), "acquired scratch dir");
        Ok(ScratchDir { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Remove `wc-*` directories under `root` not modified for `max_age`.
///
/// Failures are logged and skipped; sweeping never blocks a write.
pub fn sweep_stale(root: &Path, max_age: Duration) -> usize {
    let rd = match fs::read_dir(root) {
        Ok(rd) => rd,
        Err(_) => return 0,
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for ent in rd.flatten() {
        let name = ent.file_name().to_string_lossy().to_string();
        if !name.starts_with(PREFIX) {
            continue;
        }
        let Ok(meta) = ent.metadata() else {
            continue;
        };
        if !meta.is_dir() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        match fs::remove_dir_all(ent.path()) {
            Ok(_) => {
                debug!(dir = %name, "removed stale working copy");
                removed += 1;
            }
            Err(e) => warn!(dir = %name, error = %e, "could not remove stale working copy"),
        }
    }
    removed
}

/// Make `dir` absent so a clone can start from nothing.
pub fn reset_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("remove {}", dir.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn scratch_dir_is_removed_on_drop() {
        let td = tempdir().unwrap();
        let root = td.path().join("scratch");
        let kept;
        {
            let s = ScratchDir::acquire(&root).unwrap();
            kept = s.path().to_path_buf();
            assert!(kept.is_dir());
            assert!(
                kept.file_name()
                    .unwrap()
                    .to_string_lossy()
                    .starts_with(PREFIX)
            );
            fs::write(kept.join("file"), "x").unwrap();
        }
        assert!(!kept.exists());
        assert!(root.is_dir());
    }

    #[test]
    fn concurrent_acquisitions_are_isolated() {
        let td = tempdir().unwrap();
        let a = ScratchDir::acquire(td.path()).unwrap();
        let b = ScratchDir::acquire(td.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn sweep_removes_only_old_working_copies() {
        let td = tempdir().unwrap();
        let root = td.path();
        fs::create_dir_all(root.join("wc-abandoned").join("_posts")).unwrap();
        fs::create_dir_all(root.join("unrelated")).unwrap();
        fs::write(root.join("wc-file"), "not a dir").unwrap();

        assert_eq!(sweep_stale(root, STALE_AFTER), 0);
        assert!(root.join("wc-abandoned").exists());

        assert_eq!(sweep_stale(root, Duration::ZERO), 1);
        assert!(!root.join("wc-abandoned").exists());
        assert!(root.join("unrelated").exists());
        assert!(root.join("wc-file").exists());
    }

    #[test]
    fn sweep_of_missing_root_is_noop() {
        let td = tempdir().unwrap();
        assert_eq!(sweep_stale(&td.path().join("nope"), Duration::ZERO), 0);
    }

    #[test]
    fn reset_dir_tolerates_missing_and_clears_existing() {
        let td = tempdir().unwrap();
        let d = td.path().join("repo");
        reset_dir(&d).unwrap();
        fs::create_dir_all(d.join("nested")).unwrap();
        fs::write(d.join("nested").join("f"), "x").unwrap();
        reset_dir(&d).unwrap();
        assert!(!d.exists());
    }
}
