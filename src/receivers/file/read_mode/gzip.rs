// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::path::Path;

use tracing::{debug, error, warn};

use crate::receivers::file::config::ReadModeConfig;
use crate::receivers::file::input::{FileId, TrackedFile};
use crate::receivers::file::persistence::{CompletionMarker, PositionStore};
use crate::receivers::file::sink::LineSink;

use super::probe::{ArchiveProbe, FullDecodeProbe};
use super::release::ReleaseGuard;
use super::stream::ArchiveStream;

/// What a single call to [`CompressedFileReader::read`] did with an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The stored marker already covers the archive's size; nothing was read.
    AlreadyProcessed,
    /// The validity probe rejected the archive; it was unwatched silently.
    Corrupt,
    /// Every line was emitted and the marker now records `size`.
    Completed { lines: u64, size: u64 },
    /// Decoding failed part way through; the archive stays watched for a full retry.
    Failed,
}

/// Reads gzip-compressed files all-or-nothing.
///
/// A gzip stream can only be decoded from byte zero, so the only position
/// ever recorded is the completion marker written after the last line was
/// emitted. Anything short of that leaves the marker unset and the next
/// discovery re-reads the whole archive.
pub struct CompressedFileReader<S> {
    store: S,
    probe: Option<Box<dyn ArchiveProbe>>,
}

impl<S: PositionStore> CompressedFileReader<S> {
    /// Build a reader, enabling the full-decode probe when the config asks for it.
    pub fn new(config: &ReadModeConfig, store: S) -> Self {
        let probe: Option<Box<dyn ArchiveProbe>> = if config.check_archive_validity {
            Some(Box::new(FullDecodeProbe))
        } else {
            None
        };
        Self { store, probe }
    }

    pub fn with_probe(store: S, probe: impl ArchiveProbe + 'static) -> Self {
        Self {
            store,
            probe: Some(Box::new(probe)),
        }
    }

    pub fn without_probe(store: S) -> Self {
        Self { store, probe: None }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process one archive for this polling cycle.
    ///
    /// Always returns false: whatever happens, this archive needs nothing more
    /// from the current cycle.
    pub fn handle(&mut self, file: &mut TrackedFile) -> bool {
        let outcome = self.read(file);
        debug!(path = %file.path().display(), ?outcome, "Handled gzip file");
        false
    }

    /// Process one archive and report what happened.
    pub fn read(&mut self, file: &mut TrackedFile) -> ReadOutcome {
        let key = file.file_id();
        let size = file.size();

        if self.store.exists(&key) {
            if self.store.get(&key).is_some_and(|m| m.covers(size)) {
                debug!(
                    path = %file.path().display(),
                    key = %key,
                    size,
                    "Skipping already processed gzip file"
                );
                file.unwatch();
                return ReadOutcome::AlreadyProcessed;
            }
        } else {
            self.store.register(&key, file.path());
        }

        if self.probe.as_ref().is_some_and(|p| p.is_corrupt(file.path())) {
            file.unwatch();
            return ReadOutcome::Corrupt;
        }

        file.listener().opened();
        self.read_pass(file, key, size)
    }

    fn read_pass(&mut self, file: &mut TrackedFile, key: FileId, size: u64) -> ReadOutcome {
        let path = file.path().to_path_buf();

        let result = emit_lines(&path, file.listener());
        let consumer_gone = file.listener().is_closed();

        match result {
            Ok(lines) if consumer_gone => {
                // Lines went nowhere, so the archive must stay eligible for a full re-read
                warn!(
                    path = %path.display(),
                    lines,
                    "Line consumer is gone, leaving gzip file unread"
                );
                file.listener().error();
                ReadOutcome::Failed
            }
            Ok(lines) => {
                file.listener().eof();
                self.store.put(&key, CompletionMarker::Complete(size));
                self.store.request_flush();
                file.listener().deleted();
                file.unwatch();

                debug!(
                    path = %path.display(),
                    lines,
                    size,
                    "Finished reading gzip file"
                );
                ReadOutcome::Completed { lines, size }
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    error_kind = ?e.kind(),
                    error = %e,
                    "Cannot decompress the gzip file at path: {}",
                    path.display()
                );
                file.listener().error();
                ReadOutcome::Failed
            }
        }
    }
}

/// Decode every line of the archive into `listener`, returning the line count.
/// All stream layers are released before this returns, on every path.
fn emit_lines(path: &Path, listener: &mut dyn LineSink) -> io::Result<u64> {
    let mut guard = ReleaseGuard::new(ArchiveStream::open_lines(path)?);
    let stream = guard.get_mut()?;

    let mut line = String::new();
    let mut count = 0u64;
    while stream.next_line(&mut line)? {
        listener.accept(std::mem::take(&mut line));
        count += 1;
    }
    Ok(count)
}
