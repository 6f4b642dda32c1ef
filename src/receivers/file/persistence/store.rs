// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use crate::receivers::file::input::FileId;

use super::schema::CompletionMarker;

/// Where completion markers live between polling cycles and restarts.
///
/// Shared by every reader in the process; a given key is only ever mutated by
/// the single invocation that currently owns that file.
pub trait PositionStore {
    /// Whether any entry, set or unset, exists for this file.
    fn exists(&self, key: &FileId) -> bool;

    fn get(&self, key: &FileId) -> Option<CompletionMarker>;

    /// Record a marker. A `Complete` value already stored is never lowered.
    fn put(&mut self, key: &FileId, marker: CompletionMarker);

    /// Create an `Unset` placeholder. Existing entries are left untouched.
    fn register(&mut self, key: &FileId, path: &Path);

    /// Ask for the current state to be made durable at the next opportunity.
    /// Never blocks and never fails.
    fn request_flush(&self);
}
