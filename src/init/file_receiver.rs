// SPDX-License-Identifier: Apache-2.0

use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;

use crate::receivers::file::config::{DEFAULT_OFFSETS_PATH, ReadModeConfig};

#[derive(Debug, Args, Clone, Deserialize)]
#[serde(default)]
pub struct FileReceiverArgs {
    /// Comma-separated glob patterns for archives to include (e.g., "/var/log/*.gz,/tmp/*.gz")
    #[arg(long, env = "GZTAIL_FILE_RECEIVER_INCLUDE", value_delimiter = ',')]
    pub file_receiver_include: Vec<String>,

    /// Comma-separated glob patterns for archives to exclude
    #[arg(long, env = "GZTAIL_FILE_RECEIVER_EXCLUDE", value_delimiter = ',')]
    pub file_receiver_exclude: Vec<String>,

    /// Decode each archive fully before emitting any line, skipping corrupt ones
    #[arg(
        long,
        env = "GZTAIL_FILE_RECEIVER_CHECK_ARCHIVE_VALIDITY",
        default_value = "false"
    )]
    pub file_receiver_check_archive_validity: bool,

    /// Path to store completion markers for persistence across restarts
    #[arg(
        long,
        env = "GZTAIL_FILE_RECEIVER_OFFSETS_PATH",
        default_value = DEFAULT_OFFSETS_PATH
    )]
    pub file_receiver_offsets_path: PathBuf,
}

impl Default for FileReceiverArgs {
    fn default() -> Self {
        Self {
            file_receiver_include: Vec::new(),
            file_receiver_exclude: Vec::new(),
            file_receiver_check_archive_validity: false,
            file_receiver_offsets_path: PathBuf::from(DEFAULT_OFFSETS_PATH),
        }
    }
}

impl FileReceiverArgs {
    /// Build the read mode config from command line args
    pub fn build_config(&self) -> ReadModeConfig {
        ReadModeConfig {
            include: self.file_receiver_include.clone(),
            exclude: self.file_receiver_exclude.clone(),
            check_archive_validity: self.file_receiver_check_archive_validity,
            offsets_path: self.file_receiver_offsets_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config() {
        let args = FileReceiverArgs {
            file_receiver_include: vec!["/var/log/*.gz".to_string()],
            file_receiver_check_archive_validity: true,
            ..Default::default()
        };

        let config = args.build_config();
        assert_eq!(config.include, vec!["/var/log/*.gz"]);
        assert!(config.check_archive_validity);
        assert_eq!(config.offsets_path, PathBuf::from(DEFAULT_OFFSETS_PATH));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let args: FileReceiverArgs = serde_json::from_str(
            r#"{"file_receiver_include": ["/a/*.gz"], "file_receiver_check_archive_validity": true}"#,
        )
        .unwrap();

        assert_eq!(args.file_receiver_include, vec!["/a/*.gz"]);
        assert!(args.file_receiver_check_archive_validity);
        assert!(args.file_receiver_exclude.is_empty());
    }
}
