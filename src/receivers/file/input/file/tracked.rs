// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::receivers::file::error::{Error, Result};
use crate::receivers::file::sink::LineSink;

use super::file_id::FileId;

/// Whether the scanner should keep offering this file to a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchState {
    Watched,
    Unwatched,
}

/// A file under observation, as handed to a reader by the scanner.
///
/// Size and modification time are the values from the most recent stat;
/// the scanner calls [`TrackedFile::refresh`] before each polling cycle.
pub struct TrackedFile {
    path: PathBuf,
    file_id: FileId,
    size: u64,
    modified: Option<SystemTime>,
    state: WatchState,
    listener: Box<dyn LineSink>,
}

impl TrackedFile {
    /// Build a tracked file from already-known identity and size.
    pub fn new(
        path: impl AsRef<Path>,
        file_id: FileId,
        size: u64,
        listener: Box<dyn LineSink>,
    ) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file_id,
            size,
            modified: None,
            state: WatchState::Watched,
            listener,
        }
    }

    /// Stat a file on disk and start watching it.
    pub fn discover(path: impl AsRef<Path>, listener: Box<dyn LineSink>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let metadata = file.metadata()?;

        Ok(Self {
            path: path.to_path_buf(),
            file_id: FileId::from_file(&file)?,
            size: metadata.len(),
            modified: metadata.modified().ok(),
            state: WatchState::Watched,
            listener,
        })
    }

    /// Re-read size and modification time from the filesystem.
    pub fn refresh(&mut self) -> io::Result<()> {
        let metadata = std::fs::metadata(&self.path)?;
        self.size = metadata.len();
        self.modified = metadata.modified().ok();
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// Size from the last stat, in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn is_watched(&self) -> bool {
        self.state == WatchState::Watched
    }

    /// Drop this file from the watch set. It stays unwatched until rediscovered.
    pub fn unwatch(&mut self) {
        self.state = WatchState::Unwatched;
    }

    pub fn listener(&mut self) -> &mut dyn LineSink {
        self.listener.as_mut()
    }
}

impl std::fmt::Debug for TrackedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedFile")
            .field("path", &self.path)
            .field("file_id", &self.file_id)
            .field("size", &self.size)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receivers::file::sink::RecordingSink;
    use std::io::Write;

    #[test]
    fn test_discover_reads_stat() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 512]).unwrap();
        file.flush().unwrap();

        let tracked = TrackedFile::discover(file.path(), Box::new(RecordingSink::new())).unwrap();

        assert_eq!(tracked.size(), 512);
        assert_eq!(tracked.file_id(), FileId::from_path(file.path()).unwrap());
        assert!(tracked.modified().is_some());
        assert!(tracked.is_watched());
    }

    #[test]
    fn test_discover_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = TrackedFile::discover(dir.path().join("a.gz"), Box::new(RecordingSink::new()));
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_refresh_picks_up_new_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        file.flush().unwrap();

        let mut tracked =
            TrackedFile::discover(file.path(), Box::new(RecordingSink::new())).unwrap();
        file.write_all(b"def").unwrap();
        file.flush().unwrap();

        tracked.refresh().unwrap();
        assert_eq!(tracked.size(), 6);
    }

    #[test]
    fn test_unwatch() {
        let mut tracked = TrackedFile::new(
            "/var/log/a.gz",
            FileId::new(1, 2),
            512,
            Box::new(RecordingSink::new()),
        );
        assert!(tracked.is_watched());

        tracked.unwatch();
        assert!(!tracked.is_watched());
    }
}
