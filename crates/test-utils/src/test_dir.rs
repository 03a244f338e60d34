//! Temporary directories for node manifests.

// Test utilities are expected to panic on failure
#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory removed when dropped.
///
/// ```
/// use shardgate_test_utils::TestDir;
///
/// let dir = TestDir::new();
/// let manifest = dir.write("nodes.json", r#"{"nodes": []}"#);
/// assert!(manifest.exists());
/// ```
pub struct TestDir {
    inner: TempDir,
}

impl TestDir {
    /// Creates a new temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: TempDir::new().expect("failed to create temp directory") }
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Returns `path` resolved inside the directory.
    #[must_use]
    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.inner.path().join(path)
    }

    /// Writes `contents` to `name` inside the directory, replacing any existing
    /// file, and returns the full path.
    ///
    /// The write goes through a sibling temporary file and a rename, so a
    /// concurrent reader sees either the old or the new contents.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write<P: AsRef<Path>>(&self, name: P, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.join(name);
        let staging = path.with_extension("tmp");
        std::fs::write(&staging, contents).expect("failed to write staging file");
        std::fs::rename(&staging, &path).expect("failed to move staging file into place");
        path
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
