//! Golden and actual snapshot storage
//!
//! ```text
//! <root>/snapshots/<device>/<test_case>/00000.png       golden references
//! <root>/snapshots-tmp/<device>/<test_case>/00000.png   captures of the last run
//! ```
//!
//! Goldens are only ever written by recording runs, one atomic rename per
//! file. Captures are rewritten on every run.

use std::path::{Path, PathBuf};

use crate::common::{Error, Result};
use crate::screen::Device;

pub const GOLDEN_DIR: &str = "snapshots";
pub const TMP_DIR: &str = "snapshots-tmp";

/// Snapshot directories of one test case on one device
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    golden: PathBuf,
    tmp: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: &Path, device: &Device, test_case: &str) -> Result<Self> {
        validate_test_case(test_case)?;
        Ok(Self {
            golden: root.join(GOLDEN_DIR).join(device.name).join(test_case),
            tmp: root.join(TMP_DIR).join(device.name).join(test_case),
        })
    }

    pub fn golden_dir(&self) -> &Path {
        &self.golden
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.tmp
    }

    pub fn golden_path(&self, index: usize) -> PathBuf {
        self.golden.join(file_name(index))
    }

    pub fn tmp_path(&self, index: usize) -> PathBuf {
        self.tmp.join(file_name(index))
    }

    /// Empty (or create) the capture directory
    pub fn reset_tmp(&self) -> Result<()> {
        if self.tmp.exists() {
            std::fs::remove_dir_all(&self.tmp)?;
        }
        std::fs::create_dir_all(&self.tmp)?;
        Ok(())
    }

    /// Keep a capture for post-mortem inspection
    pub fn save_tmp(&self, index: usize, image: &[u8]) -> Result<PathBuf> {
        let path = self.tmp_path(index);
        std::fs::write(&path, image)?;
        Ok(path)
    }

    /// Golden of a step, `None` when it was never recorded
    pub fn read_golden(&self, index: usize) -> Result<Option<Vec<u8>>> {
        let path = self.golden_path(index);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::FileRead {
                path: path.display().to_string(),
                error: e.to_string(),
            }),
        }
    }

    /// Write a golden through a temporary file and a rename
    pub fn record(&self, index: usize, image: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.golden)?;
        let path = self.golden_path(index);
        let partial = self.golden.join(format!(".{}.partial", file_name(index)));
        std::fs::write(&partial, image)?;
        std::fs::rename(&partial, &path)?;
        Ok(path)
    }

    /// Indices of the recorded goldens, sorted
    pub fn golden_indices(&self) -> Result<Vec<usize>> {
        if !self.golden.is_dir() {
            return Ok(Vec::new());
        }
        let mut indices = Vec::new();
        for entry in std::fs::read_dir(&self.golden)? {
            let name = entry?.file_name();
            if let Some(index) = name.to_str().and_then(parse_file_name) {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    /// Delete goldens at `count` and beyond, left over from a longer flow
    pub fn remove_stale(&self, count: usize) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for index in self.golden_indices()? {
            if index >= count {
                let path = self.golden_path(index);
                std::fs::remove_file(&path)?;
                removed.push(path);
            }
        }
        Ok(removed)
    }
}

fn file_name(index: usize) -> String {
    format!("{:05}.png", index)
}

fn parse_file_name(name: &str) -> Option<usize> {
    let stem = name.strip_suffix(".png")?;
    if stem.len() == 5 && stem.bytes().all(|b| b.is_ascii_digit()) {
        stem.parse().ok()
    } else {
        None
    }
}

fn validate_test_case(test_case: &str) -> Result<()> {
    let path = Path::new(test_case);
    let plain = !test_case.is_empty()
        && path
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
    if !plain {
        return Err(Error::Config(format!(
            "Invalid test case name '{}': use a relative path without '..'",
            test_case
        )));
    }
    Ok(())
}
