// SPDX-License-Identifier: Apache-2.0

//! Persistence schema for completion markers.
//!
//! A compressed archive cannot be resumed part way through, so the only
//! position ever stored for one is "not finished" or "finished at N bytes".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Current schema version for persisted state
pub const PERSISTED_STATE_VERSION: u8 = 1;

/// Consumed-bytes marker for one archive.
///
/// There is no intermediate value: an archive is either still unread
/// (`Unset`) or was read to the end when it was `size` bytes long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "size", rename_all = "snake_case")]
pub enum CompletionMarker {
    /// Registered but never read to completion
    #[default]
    Unset,
    /// Fully read when the archive had this many bytes
    Complete(u64),
}

impl CompletionMarker {
    /// True when this marker proves an archive of `size` bytes was already consumed.
    pub fn covers(&self, size: u64) -> bool {
        match self {
            CompletionMarker::Unset => false,
            CompletionMarker::Complete(consumed) => *consumed >= size,
        }
    }

    /// Merge a newly written marker into this one without ever moving backwards.
    pub(crate) fn advance(self, next: CompletionMarker) -> CompletionMarker {
        match (self, next) {
            (CompletionMarker::Complete(old), CompletionMarker::Complete(new)) => {
                CompletionMarker::Complete(old.max(new))
            }
            (CompletionMarker::Complete(old), CompletionMarker::Unset) => {
                CompletionMarker::Complete(old)
            }
            (CompletionMarker::Unset, next) => next,
        }
    }
}

/// Persisted state for all known archives (v1).
/// Key is "dev:ino" for lookup by identity.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedStateV1 {
    /// Schema version (always 1 for this format)
    pub version: u8,
    /// Map from file key (dev:ino) to file entry
    pub files: HashMap<String, PersistedFileEntryV1>,
}

impl Default for PersistedStateV1 {
    fn default() -> Self {
        Self {
            version: PERSISTED_STATE_VERSION,
            files: HashMap::new(),
        }
    }
}

/// Persisted state for a single archive (v1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedFileEntryV1 {
    // Human-readable metadata, not used for matching
    /// Last known path to the file
    pub path: String,
    /// Last known filename
    pub filename: String,

    /// Device ID (Unix) or volume serial (Windows)
    pub dev: u64,
    /// Inode number (Unix) or file index (Windows)
    pub ino: u64,

    pub marker: CompletionMarker,
}

impl PersistedFileEntryV1 {
    /// Generate the map key for this entry ("dev:ino" format)
    pub fn key(&self) -> String {
        format!("{}:{}", self.dev, self.ino)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_covers() {
        assert!(!CompletionMarker::Unset.covers(0));
        assert!(!CompletionMarker::Unset.covers(512));
        assert!(CompletionMarker::Complete(0).covers(0));
        assert!(CompletionMarker::Complete(512).covers(512));
        assert!(CompletionMarker::Complete(512).covers(100));
        assert!(!CompletionMarker::Complete(512).covers(513));
    }

    #[test]
    fn test_marker_never_moves_backwards() {
        let done = CompletionMarker::Complete(512);
        assert_eq!(
            done.advance(CompletionMarker::Unset),
            CompletionMarker::Complete(512)
        );
        assert_eq!(
            done.advance(CompletionMarker::Complete(100)),
            CompletionMarker::Complete(512)
        );
        assert_eq!(
            done.advance(CompletionMarker::Complete(1024)),
            CompletionMarker::Complete(1024)
        );
        assert_eq!(
            CompletionMarker::Unset.advance(CompletionMarker::Complete(7)),
            CompletionMarker::Complete(7)
        );
    }

    #[test]
    fn test_marker_wire_format() {
        assert_eq!(
            serde_json::to_value(CompletionMarker::Unset).unwrap(),
            serde_json::json!({"state": "unset"})
        );
        assert_eq!(
            serde_json::to_value(CompletionMarker::Complete(512)).unwrap(),
            serde_json::json!({"state": "complete", "size": 512})
        );
    }

    #[test]
    fn test_persisted_file_entry_v1_key() {
        let entry = PersistedFileEntryV1 {
            path: "/var/log/app.log.1.gz".to_string(),
            filename: "app.log.1.gz".to_string(),
            dev: 1,
            ino: 100,
            marker: CompletionMarker::Unset,
        };
        assert_eq!(entry.key(), "1:100");
    }

    #[test]
    fn test_persisted_state_v1_default() {
        let state = PersistedStateV1::default();
        assert_eq!(state.version, PERSISTED_STATE_VERSION);
        assert!(state.files.is_empty());
    }
}
