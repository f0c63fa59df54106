//! Stream-reference writer.

use std::fs;
use std::path::{Path, PathBuf};

use torrlib_torrent_core::TorrentRecord;
use tracing::{debug, info, warn};

use crate::error::{LibraryError, LibraryResult, PathFailure};
use crate::layout::{Library, stream_ref_name, stream_url};

/// Outcome of one materialization pass.
#[derive(Debug, Default)]
pub struct MaterializeReport {
    /// Root directory the files were written under.
    pub root: PathBuf,
    /// Stream-reference files written.
    pub written: Vec<PathBuf>,
    /// Files skipped because they are not streamable.
    pub skipped: usize,
    /// Files that could not be written.
    pub failures: Vec<PathFailure>,
}

impl Library {
    /// Write one stream-reference file per streamable file of `record` and
    /// record the root in `record.materialized_path`.
    ///
    /// Per-file failures are logged and reported; the remaining files are
    /// still written. Running the pass twice on an unchanged record produces
    /// identical files.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::UnsafeComponent`] when the record's layout
    /// would leave the library; nothing is written in that case.
    pub fn materialize(
        &self,
        record: &mut TorrentRecord,
        host: &str,
    ) -> LibraryResult<MaterializeReport> {
        let root = self.torrent_root(record)?;
        let mut report = MaterializeReport {
            root: root.clone(),
            ..MaterializeReport::default()
        };

        let mut streamable = 0usize;
        for file in record.streamable_files() {
            streamable += 1;
            let target = root.join(stream_ref_name(&file.path));
            let content = stream_url(host, &record.hash, file);
            match write_stream_ref(&target, &content) {
                Ok(()) => {
                    debug!(hash = %record.hash, path = %target.display(), "stream reference written");
                    report.written.push(target);
                }
                Err(error) => {
                    warn!(
                        hash = %record.hash,
                        path = %target.display(),
                        error = %error,
                        "failed to write stream reference"
                    );
                    report.failures.push(PathFailure {
                        path: target,
                        error,
                    });
                }
            }
        }

        report.skipped = record.files.len() - streamable;
        info!(
            hash = %record.hash,
            root = %root.display(),
            written = report.written.len(),
            failed = report.failures.len(),
            "library materialized"
        );
        record.materialized_path = Some(root);
        Ok(report)
    }
}

fn write_stream_ref(target: &Path, content: &str) -> LibraryResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| LibraryError::io("create_dir_all", parent, source))?;
    }
    fs::write(target, content).map_err(|source| LibraryError::io("write", target, source))
}
