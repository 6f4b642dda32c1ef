// SPDX-License-Identifier: Apache-2.0

mod file_id;
mod finder;
mod tracked;

pub use file_id::FileId;
pub use finder::FileFinder;
pub use tracked::TrackedFile;
