// SPDX-License-Identifier: Apache-2.0

use glob::{Pattern, glob};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::receivers::file::error::{Error, Result};

/// Finds archives matching include patterns, minus anything matching an exclude pattern.
#[derive(Debug, Clone)]
pub struct FileFinder {
    include: Vec<String>,
    exclude: Vec<Pattern>,
}

impl FileFinder {
    /// Create a finder, rejecting malformed exclude patterns up front.
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Result<Self> {
        let exclude = exclude
            .iter()
            .map(|p| Pattern::new(p).map_err(|e| Error::InvalidGlob(format!("{}: {}", p, e))))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { include, exclude })
    }

    /// Run one discovery pass. Results are de-duplicated and sorted by path.
    pub fn find_files(&self) -> Result<Vec<PathBuf>> {
        let mut found = BTreeSet::new();

        for pattern in &self.include {
            let matches =
                glob(pattern).map_err(|e| Error::InvalidGlob(format!("{}: {}", pattern, e)))?;

            for entry in matches {
                let path = entry.map_err(|e| Error::Io(e.into()))?;

                if path.is_dir() {
                    continue;
                }

                if self.exclude.iter().any(|p| p.matches_path(&path)) {
                    continue;
                }

                found.insert(path);
            }
        }

        Ok(found.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_test_files(dir: &TempDir) {
        for name in ["b.log.gz", "a.log.gz", "notes.txt", "debug.log.gz"] {
            fs::write(dir.path().join(name), name).unwrap();
        }
        fs::create_dir(dir.path().join("nested.gz")).unwrap();
    }

    #[test]
    fn test_finder_sorted_and_skips_dirs() {
        let dir = TempDir::new().unwrap();
        setup_test_files(&dir);

        let pattern = format!("{}/*.gz", dir.path().display());
        let finder = FileFinder::new(vec![pattern], vec![]).unwrap();

        let names: Vec<_> = finder
            .find_files()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.log.gz", "b.log.gz", "debug.log.gz"]);
    }

    #[test]
    fn test_finder_with_exclude() {
        let dir = TempDir::new().unwrap();
        setup_test_files(&dir);

        let include = format!("{}/*.gz", dir.path().display());
        let exclude = format!("{}/debug*", dir.path().display());
        let finder = FileFinder::new(vec![include], vec![exclude]).unwrap();

        assert_eq!(finder.find_files().unwrap().len(), 2);
    }

    #[test]
    fn test_finder_no_duplicates() {
        let dir = TempDir::new().unwrap();
        setup_test_files(&dir);

        let pattern = format!("{}/*.gz", dir.path().display());
        let finder = FileFinder::new(vec![pattern.clone(), pattern], vec![]).unwrap();

        assert_eq!(finder.find_files().unwrap().len(), 3);
    }

    #[test]
    fn test_finder_rejects_bad_exclude() {
        let result = FileFinder::new(vec![], vec!["[".to_string()]);
        assert!(matches!(result, Err(Error::InvalidGlob(_))));
    }

    #[test]
    fn test_finder_picks_up_new_archives() {
        let dir = TempDir::new().unwrap();
        let pattern = format!("{}/*.gz", dir.path().display());
        let finder = FileFinder::new(vec![pattern], vec![]).unwrap();

        assert!(finder.find_files().unwrap().is_empty());

        fs::write(dir.path().join("rotated.1.gz"), b"x").unwrap();
        assert_eq!(finder.find_files().unwrap().len(), 1);
    }
}
