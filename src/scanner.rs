use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{MineError, Result};

const DEFAULT_INCLUDE: &[&str] = &["**/*.swift"];
const DEFAULT_EXCLUDE: &[&str] = &["**/.build/**", "**/DerivedData/**", "**/__MACOSX/**"];

/// Finds source files under a directory by include/exclude globs.
#[derive(Debug, Clone)]
pub struct SourceScanner {
    include: GlobSet,
    exclude: GlobSet,
}

impl Default for SourceScanner {
    fn default() -> Self {
        Self::swift()
    }
}

impl SourceScanner {
    pub fn new(include: &[&str], exclude: &[&str]) -> Result<Self> {
        Ok(Self {
            include: build_globset(include)?,
            exclude: build_globset(exclude)?,
        })
    }

    /// `**/*.swift`, skipping build output and archive metadata.
    pub fn swift() -> Self {
        Self {
            include: build_globset(DEFAULT_INCLUDE).unwrap_or_else(|_| GlobSet::empty()),
            exclude: build_globset(DEFAULT_EXCLUDE).unwrap_or_else(|_| GlobSet::empty()),
        }
    }

    /// Matching files under `root`, sorted by path. Unreadable entries are
    /// logged and skipped.
    pub fn scan(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if self.include.is_match(relative) && !self.exclude.is_match(relative) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        debug!("Found {} matching files under {}", files.len(), root.display());
        files
    }
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| MineError::Config(format!("invalid glob '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| MineError::Config(format!("invalid glob set: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_finds_nested_swift_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("World/World")).unwrap();
        std::fs::create_dir_all(root.join("World/.build/debug")).unwrap();
        std::fs::write(root.join("World/World/App.swift"), "").unwrap();
        std::fs::write(root.join("World/World/README.md"), "").unwrap();
        std::fs::write(root.join("World/.build/debug/Gen.swift"), "").unwrap();
        std::fs::write(root.join("Top.swift"), "").unwrap();

        let files = SourceScanner::swift().scan(root);
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "swift"));
        assert!(files.iter().all(|f| !f.to_string_lossy().contains(".build")));
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let err = SourceScanner::new(&["[unclosed"], &[]).unwrap_err();
        assert!(matches!(err, MineError::Config(_)));
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let files = SourceScanner::swift().scan(Path::new("/definitely/not/here"));
        assert!(files.is_empty());
    }
}
