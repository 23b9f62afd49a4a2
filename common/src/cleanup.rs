//! Scoped cleanup of partially written artifacts
//!
//! Replaces trap-style "run on any exit" cleanup with a guard whose
//! release action runs deterministically on every exit path of the
//! enclosing operation. The guard only ever removes a path this
//! invocation marked as owned, so a pre-existing archive passed in for
//! list/restore is never touched.

/// Guard over the single artifact a backup invocation may create.
#[derive(Debug, Default)]
pub struct CleanupGuard {
    owned: Option<std::path::PathBuf>,
}

impl CleanupGuard {
    /// A guard that owns nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` as created by this invocation.
    ///
    /// Called exactly once, after the output location is resolved and
    /// only when no file pre-exists at it.
    pub fn own(&mut self, path: &std::path::Path) {
        debug_assert!(self.owned.is_none(), "guard already owns an artifact");
        self.owned = Some(path.to_path_buf());
    }

    /// Release the guard on successful completion; the artifact is kept.
    pub fn disarm(&mut self) {
        self.owned = None;
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let Some(path) = self.owned.take() else {
            return;
        };
        if !path.exists() {
            return;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::warn!("removed partial artifact {}", path.display()),
            Err(error) => tracing::error!(
                "failed to remove partial artifact {}: {error}",
                path.display()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_artifact_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("backup.tar.zst");
        std::fs::write(&artifact, "partial").unwrap();
        {
            let mut guard = CleanupGuard::new();
            guard.own(&artifact);
        }
        assert!(!artifact.exists());
    }

    #[test]
    fn disarmed_guard_keeps_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("backup.tar.zst");
        std::fs::write(&artifact, "complete").unwrap();
        {
            let mut guard = CleanupGuard::new();
            guard.own(&artifact);
            guard.disarm();
        }
        assert!(artifact.exists());
    }

    #[test]
    fn unowned_files_are_never_touched() {
        let dir = tempfile::tempdir().unwrap();
        let pre_existing = dir.path().join("backup.tar.zst");
        std::fs::write(&pre_existing, "older backup").unwrap();
        {
            let _guard = CleanupGuard::new();
            // simulated failure before the guard ever owned a path
        }
        assert!(pre_existing.exists());
        assert_eq!(
            std::fs::read_to_string(&pre_existing).unwrap(),
            "older backup"
        );
    }

    #[test]
    fn missing_owned_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let never_written = dir.path().join("backup.tar.zst");
        let mut guard = CleanupGuard::new();
        guard.own(&never_written);
        drop(guard);
    }
}
