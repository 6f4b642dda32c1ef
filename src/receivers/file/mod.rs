// SPDX-License-Identifier: Apache-2.0

//! File receiver for gzip-compressed log archives.
//!
//! Each archive matching the configured globs is decoded end to end exactly
//! once and its lines are handed to a per-file sink.
//!
//! Features:
//! - Inode-based identity, so renamed archives are not read twice
//! - Completion markers persisted with atomic JSON writes
//! - Optional full-decode validity check before any line is emitted

pub mod config;
pub mod error;
pub mod input;
pub mod persistence;
pub mod read_mode;
pub mod sink;

pub use config::ReadModeConfig;
pub use error::{Error, Result};
pub use input::{FileFinder, FileId, TrackedFile};
pub use persistence::{CompletionMarker, JsonFileDatabase, PositionStore};
pub use read_mode::{ArchiveProbe, CompressedFileReader, FullDecodeProbe, ReadOutcome};
pub use sink::{ChannelLineSink, LineEvent, LineSink, RecordingSink, SinkMessage};
