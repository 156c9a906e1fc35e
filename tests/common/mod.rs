#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use tempfile::{TempDir, tempdir};

/// Scratch directory holding staged upload fixtures for one test case;
/// removed on drop.
pub struct UploadDir {
    root: TempDir,
}

impl UploadDir {
    pub fn new() -> Self {
        Self {
            root: tempdir().expect("temp dir"),
        }
    }

    /// Writes a tabular upload fixture and returns its path.
    pub fn stage(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, contents).expect("write upload fixture");
        path
    }

    /// Path for a command output file inside the scratch directory.
    pub fn output(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }
}
