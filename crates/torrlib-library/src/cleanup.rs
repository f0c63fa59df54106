//! Stream-reference removal.
//!
//! # Design
//! - A saved `materialized_path` is authoritative; the layout is recomputed
//!   only when no path was saved.
//! - Failures are logged and reported, never raised.
//! - The base directory and category directories are never removed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use torrlib_torrent_core::TorrentRecord;
use tracing::{debug, info, warn};

use crate::classify::LibraryCategory;
use crate::error::{LibraryError, PathFailure};
use crate::layout::Library;

/// Outcome of one cleanup pass.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Directories removed.
    pub removed: Vec<PathBuf>,
    /// Paths that could not be removed.
    pub failures: Vec<PathFailure>,
}

impl CleanupReport {
    /// True when nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, path: PathBuf, error: LibraryError) {
        warn!(path = %path.display(), error = %error, "library cleanup failed");
        self.failures.push(PathFailure { path, error });
    }
}

impl Library {
    /// Remove a record's stream-reference tree and prune an emptied custom
    /// directory.
    #[must_use]
    pub fn cleanup(&self, record: &TorrentRecord) -> CleanupReport {
        let mut report = CleanupReport::default();
        let uses_custom_dir = !record.custom_dir.trim().is_empty();

        let saved = record
            .materialized_path
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty());

        if let Some(root) = saved {
            if self.is_protected(root) {
                report.fail(
                    root.clone(),
                    LibraryError::ProtectedPath { path: root.clone() },
                );
                return report;
            }
            self.remove_tree(root, &mut report);
            if uses_custom_dir
                && let Some(parent) = root.parent()
                && !self.is_protected(parent)
                && !parent
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(LibraryCategory::is_category_dir)
            {
                prune_if_empty(parent, &mut report);
            }
        } else {
            debug!(hash = %record.hash, "no saved library path; recomputing layout");
            let root = match self.torrent_root(record) {
                Ok(root) => root,
                Err(error) => {
                    report.fail(self.base().to_path_buf(), error);
                    return report;
                }
            };
            self.remove_tree(&root, &mut report);
            if let Ok(Some(custom)) = self.custom_dir(record) {
                prune_if_empty(&custom, &mut report);
            }
        }

        info!(
            hash = %record.hash,
            removed = report.removed.len(),
            failed = report.failures.len(),
            "library cleaned"
        );
        report
    }

    fn remove_tree(&self, root: &Path, report: &mut CleanupReport) {
        match fs::remove_dir_all(root) {
            Ok(()) => report.removed.push(root.to_path_buf()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(path = %root.display(), base = %self.base().display(), "library directory already absent");
            }
            Err(source) => report.fail(
                root.to_path_buf(),
                LibraryError::io("remove_dir_all", root, source),
            ),
        }
    }
}

fn prune_if_empty(dir: &Path, report: &mut CleanupReport) {
    let empty = match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(error) if error.kind() == io::ErrorKind::NotFound => return,
        Err(source) => {
            report.fail(dir.to_path_buf(), LibraryError::io("read_dir", dir, source));
            return;
        }
    };
    if !empty {
        return;
    }
    match fs::remove_dir(dir) {
        Ok(()) => report.removed.push(dir.to_path_buf()),
        Err(source) => report.fail(dir.to_path_buf(), LibraryError::io("remove_dir", dir, source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;
    use torrlib_torrent_core::{FileEntry, MimeClass};
    use walkdir::WalkDir;

    fn record(name: &str, custom_dir: &str) -> TorrentRecord {
        let mut record = TorrentRecord::new("d".repeat(40).parse().expect("hash"), name);
        record.custom_dir = custom_dir.to_string();
        record.files = vec![FileEntry {
            index: 1,
            path: format!("{name}.mkv"),
            length: 1,
            mime: MimeClass::Video,
            selected: true,
        }];
        record
    }

    fn tree(dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path().to_path_buf())
            .collect()
    }

    #[test]
    fn saved_path_round_trip_keeps_shared_category_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let library = Library::new(dir.path());
        let mut first = record("Movie", "");
        let mut second = record("Other", "");
        library.materialize(&mut first, "http://host")?;
        library.materialize(&mut second, "http://host")?;

        let report = library.cleanup(&first);
        assert!(report.is_clean());
        let films = dir.path().join("torrFilms");
        assert!(!films.join("Movie").exists());
        assert!(films.join("Other").join("Other.strm").exists());

        let report = library.cleanup(&second);
        assert!(report.is_clean());
        assert!(films.exists());
        assert_eq!(tree(&films), vec![films.clone()]);
        Ok(())
    }

    #[test]
    fn emptied_custom_dir_is_pruned() -> Result<()> {
        let dir = TempDir::new()?;
        let library = Library::new(dir.path());
        let mut record = record("Movie", "Collection");
        library.materialize(&mut record, "http://host")?;
        let custom = dir.path().join("torrFilms").join("Collection");
        assert!(custom.join("Movie").exists());

        let report = library.cleanup(&record);
        assert!(report.is_clean());
        assert!(!custom.exists());
        assert!(dir.path().join("torrFilms").exists());
        Ok(())
    }

    #[test]
    fn shared_custom_dir_survives() -> Result<()> {
        let dir = TempDir::new()?;
        let library = Library::new(dir.path());
        let mut first = record("Movie", "Collection");
        let mut second = record("Sequel", "Collection");
        library.materialize(&mut first, "http://host")?;
        library.materialize(&mut second, "http://host")?;

        let _ = library.cleanup(&first);
        let custom = dir.path().join("torrFilms").join("Collection");
        assert!(custom.join("Sequel").exists());
        assert!(!custom.join("Movie").exists());
        Ok(())
    }

    #[test]
    fn missing_saved_path_recomputes_layout() -> Result<()> {
        let dir = TempDir::new()?;
        let library = Library::new(dir.path());
        let mut record = record("Show.S01E01", "Anime");
        library.materialize(&mut record, "http://host")?;
        record.materialized_path = None;

        let report = library.cleanup(&record);
        assert!(report.is_clean());
        let serials = dir.path().join("torrSerials");
        assert!(!serials.join("Anime").exists());
        assert!(serials.exists());
        Ok(())
    }

    #[test]
    fn already_absent_directories_are_not_failures() -> Result<()> {
        let dir = TempDir::new()?;
        let library = Library::new(dir.path());
        let report = library.cleanup(&record("Never.Written", ""));
        assert!(report.is_clean());
        assert!(report.removed.is_empty());
        Ok(())
    }

    #[test]
    fn protected_saved_paths_are_refused() -> Result<()> {
        let dir = TempDir::new()?;
        let library = Library::new(dir.path());
        let films = dir.path().join("torrFilms");
        fs::create_dir_all(films.join("Keep"))?;
        let mut record = record("Movie", "");
        record.materialized_path = Some(films.clone());

        let report = library.cleanup(&record);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            LibraryError::ProtectedPath { .. }
        ));
        assert!(films.join("Keep").exists());
        Ok(())
    }
}
