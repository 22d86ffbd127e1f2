//! File-backed log store adapter.
//!
//! Implements [`LogStorePort`] over `std::fs`. Streams are plain line files
//! under a base directory — a mounted FAT/LittleFS partition through the
//! ESP-IDF VFS on device, a temp directory in tests. The same code runs on
//! both targets.
//!
//! Rotation uses `rename`, which is atomic on the VFS backends we mount.
//! FAT refuses to rename over an existing file, so the stale destination is
//! removed first; a crash in that window loses only the already-superseded
//! pending batch, which rotation was about to overwrite anyway.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app::ports::LogStorePort;
use crate::error::StoreError;

pub struct FsLogStore {
    base: PathBuf,
}

impl FsLogStore {
    /// Open a store rooted at `base`, creating the directory if needed.
    pub fn new(base: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base).map_err(|_| StoreError::Io)?;
        Ok(Self { base })
    }

    fn path(&self, stream: &str) -> PathBuf {
        self.base.join(stream)
    }
}

impl LogStorePort for FsLogStore {
    fn append_line(&mut self, stream: &str, line: &str) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(stream))
            .map_err(|_| StoreError::Io)?;
        writeln!(file, "{line}").map_err(|_| StoreError::Io)
    }

    fn read_lines(&self, stream: &str) -> Result<Vec<String>, StoreError> {
        let path = self.path(stream);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path).map_err(|_| StoreError::Io)?;
        Ok(content.lines().map(str::to_owned).collect())
    }

    fn line_count(&self, stream: &str) -> Result<usize, StoreError> {
        Ok(self.read_lines(stream)?.len())
    }

    fn rotate(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        let src = self.path(from);
        let dst = self.path(to);
        if !src.exists() {
            return Err(StoreError::NotFound);
        }
        if dst.exists() {
            fs::remove_file(&dst).map_err(|_| StoreError::Io)?;
        }
        fs::rename(src, dst).map_err(|_| StoreError::Io)
    }

    fn remove(&mut self, stream: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path(stream)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(_) => Err(StoreError::Io),
        }
    }

    fn exists(&self, stream: &str) -> bool {
        self.path(stream).exists()
    }
}
