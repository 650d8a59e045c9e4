//! APDU audit trail file
//!
//! One line per frame: `=> <command hex>` then `<= <reply hex>`.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::common::Result;

pub struct ApduLog {
    path: PathBuf,
    file: File,
}

impl ApduLog {
    /// Create (or truncate) the log file
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn command(&mut self, apdu: &[u8]) -> Result<()> {
        writeln!(self.file, "=> {}", hex::encode(apdu))?;
        Ok(())
    }

    pub fn reply(&mut self, raw: &[u8]) -> Result<()> {
        writeln!(self.file, "<= {}", hex::encode(raw))?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_lines_and_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/apdu.log");

        let mut log = ApduLog::create(&path).unwrap();
        log.command(&[0xe0, 0x01, 0x00, 0x00, 0x00]).unwrap();
        log.reply(&[0x90, 0x00]).unwrap();
        drop(log);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "=> e001000000\n<= 9000\n");

        let log = ApduLog::create(&path).unwrap();
        assert_eq!(log.path(), path.as_path());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
