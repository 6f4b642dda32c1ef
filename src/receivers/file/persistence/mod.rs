// SPDX-License-Identifier: Apache-2.0

//! Persistence for completion markers.
//!
//! Uses JSON file storage with atomic writes.

mod json_file;
mod schema;
mod store;

pub use json_file::JsonFileDatabase;
pub use schema::{
    CompletionMarker, PERSISTED_STATE_VERSION, PersistedFileEntryV1, PersistedStateV1,
};
pub use store::PositionStore;
