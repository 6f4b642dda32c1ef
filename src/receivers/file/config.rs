// SPDX-License-Identifier: Apache-2.0

//! Configuration for the gzip read mode.

use std::path::PathBuf;

/// Default location of the completion marker database
pub const DEFAULT_OFFSETS_PATH: &str = "/var/lib/gztail/gzip_offsets.json";

/// Configuration for reading gzip-compressed files
#[derive(Debug, Clone)]
pub struct ReadModeConfig {
    /// Glob patterns for files to include
    pub include: Vec<String>,
    /// Glob patterns for files to exclude
    pub exclude: Vec<String>,
    /// Run a full decode pass over each archive before emitting any of its lines
    pub check_archive_validity: bool,
    /// Path to store completion markers for persistence
    pub offsets_path: PathBuf,
}

impl Default for ReadModeConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            check_archive_validity: false,
            offsets_path: PathBuf::from(DEFAULT_OFFSETS_PATH),
        }
    }
}

impl ReadModeConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.include.is_empty() {
            return Err("At least one include pattern must be specified".to_string());
        }

        if self.offsets_path.as_os_str().is_empty() {
            return Err("An offsets path must be specified".to_string());
        }

        Ok(())
    }
}
