#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use sheet_insights::{
    geography::ProfileRegistry,
    io_utils,
    normalize::{NormalizedDataset, load_dataset},
};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Reads and normalizes a fixture against the built-in geography profiles.
pub fn load_fixture(name: &str) -> NormalizedDataset {
    let registry = ProfileRegistry::builtin().expect("builtin profiles");
    let encoding = io_utils::resolve_encoding(None).expect("utf-8");
    let table = io_utils::read_table(&fixture_path(name), None, encoding).expect("read fixture");
    load_dataset(&table, &registry).expect("load fixture")
}

/// The compiled binary, ready for arguments.
pub fn sheet_insights() -> Command {
    Command::cargo_bin("sheet-insights").expect("binary exists")
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of a file inside the workspace, which need not exist yet.
    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.file(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
