use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{MineError, Result};

/// Extract a zip archive held in memory into `dest`. Entries whose names
/// would escape `dest` are skipped. Returns the number of files written.
///
/// Files are unpacked into a sibling staging directory that replaces
/// `dest` only once every entry is written, so a failed extraction leaves
/// no partial project behind.
pub fn extract_zip(bytes: &[u8], dest: &Path) -> Result<usize> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let staging = staging_dir(dest)?;
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }

    let written = match unpack(&mut archive, &staging) {
        Ok(written) => written,
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_dir_all(&staging) {
                warn!("Could not remove {}: {}", staging.display(), cleanup);
            }
            return Err(e);
        }
    };

    if dest.exists() {
        std::fs::remove_dir_all(dest)?;
    }
    std::fs::rename(&staging, dest)?;

    debug!("Extracted {} files into {}", written, dest.display());
    Ok(written)
}

fn staging_dir(dest: &Path) -> Result<PathBuf> {
    let (Some(parent), Some(name)) = (dest.parent(), dest.file_name()) else {
        return Err(MineError::Other(format!("cannot extract into {}", dest.display())));
    };
    std::fs::create_dir_all(parent)?;
    Ok(parent.join(format!(".{}.partial", name.to_string_lossy())))
}

fn unpack<R: Read + Seek>(archive: &mut zip::ZipArchive<R>, root: &Path) -> Result<usize> {
    std::fs::create_dir_all(root)?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!("Skipping unsafe archive entry: {}", entry.name());
            continue;
        };
        let target = root.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
        written += 1;
    }
    Ok(written)
}

/// [`extract_zip`] on the blocking pool.
pub async fn extract_zip_async(bytes: Vec<u8>, dest: PathBuf) -> Result<usize> {
    tokio::task::spawn_blocking(move || extract_zip(&bytes, &dest))
        .await
        .map_err(|e| MineError::Other(format!("extraction task failed: {}", e)))?
}


#[cfg(test)]
mod tests {
    use super::test_support::{build_corrupt_zip, build_zip};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extract_nested_entries() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("World");
        let bytes = build_zip(&[
            ("World/World/WorldApp.swift", "import SwiftUI"),
            ("World/README.md", "# World"),
        ]);

        let written = extract_zip(&bytes, &dest).unwrap();
        assert_eq!(written, 2);
        let app = std::fs::read_to_string(dest.join("World/World/WorldApp.swift")).unwrap();
        assert_eq!(app, "import SwiftUI");
        assert!(!dir.path().join(".World.partial").exists());
    }

    #[test]
    fn test_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let err = extract_zip(b"not a zip", &dir.path().join("World")).unwrap_err();
        assert!(matches!(err, MineError::Zip(_)));
    }

    #[test]
    fn test_checksum_failure_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("A");
        let bytes = build_corrupt_zip(&[("A/First.swift", "import SwiftUI"), ("A/Second.swift", "struct Second {}")]);

        assert!(extract_zip(&bytes, &dest).is_err());
        assert!(!dest.exists());
        assert!(!dir.path().join(".A.partial").exists());
    }

    #[test]
    fn test_replaces_previous_extraction() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("World");
        extract_zip(&build_zip(&[("Old.swift", "let old = 1")]), &dest).unwrap();
        extract_zip(&build_zip(&[("New.swift", "let new = 2")]), &dest).unwrap();

        assert!(dest.join("New.swift").exists());
        assert!(!dest.join("Old.swift").exists());
    }

    #[test]
    fn test_failed_extraction_keeps_previous_copy() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("World");
        extract_zip(&build_zip(&[("Good.swift", "let good = 1")]), &dest).unwrap();

        let corrupt = build_corrupt_zip(&[("Bad.swift", "let bad = 2")]);
        assert!(extract_zip(&corrupt, &dest).is_err());
        assert!(dest.join("Good.swift").exists());
        assert!(!dest.join("Bad.swift").exists());
    }

    #[tokio::test]
    async fn test_extract_async() {
        let dir = TempDir::new().unwrap();
        let bytes = build_zip(&[("a.swift", "let a = 1")]);
        let written = extract_zip_async(bytes, dir.path().join("a")).await.unwrap();
        assert_eq!(written, 1);
    }
}
