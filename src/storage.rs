// SPDX-License-Identifier: GPL-3.0-only

//! Storage utilities for capture sessions and artifacts
//!
//! Every artifact is written under a temporary name and renamed into place,
//! so readers never observe a partially written file under its final name.

use crate::constants::session::{
    ARTIFACT_TIMESTAMP_FORMAT, DEFAULT_DATA_FOLDER, DIR_TIMESTAMP_FORMAT,
    MAX_SESSION_DIR_ATTEMPTS,
};
use chrono::{DateTime, Local};
use ndarray::Array1;
use ndarray_npy::WriteNpyExt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default root for capture data
pub fn default_data_root() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(DEFAULT_DATA_FOLDER)
}

/// Create the per-session output directory, named by the session start time
///
/// A session started in the same second as an existing one gets a `-1`,
/// `-2`, ... suffix instead of sharing its directory.
pub fn create_session_dir(root: &Path, started_at: &DateTime<Local>) -> io::Result<PathBuf> {
    std::fs::create_dir_all(root)?;
    let stem = started_at.format(DIR_TIMESTAMP_FORMAT).to_string();

    for attempt in 0..MAX_SESSION_DIR_ATTEMPTS {
        let name = match attempt {
            0 => stem.clone(),
            n => format!("{}-{}", stem, n),
        };
        let dir = root.join(name);
        match std::fs::create_dir(&dir) {
            Ok(()) => {
                debug!(path = %dir.display(), "Created session directory");
                return Ok(dir);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free session directory name for {}", stem),
    ))
}

/// File name of a periodic snapshot: zero-padded capture counter
pub fn snapshot_file_name(index: u64, extension: &str) -> String {
    format!("{:06}.{}", index, extension)
}

/// File name of an averaged measurement: `{start}-{end}-{frame_count}.npy`
pub fn averaged_file_name(
    started_at: &DateTime<Local>,
    ended_at: &DateTime<Local>,
    frame_count: u64,
) -> String {
    format!(
        "{}-{}-{}.npy",
        started_at.format(ARTIFACT_TIMESTAMP_FORMAT),
        ended_at.format(ARTIFACT_TIMESTAMP_FORMAT),
        frame_count
    )
}

/// Write a file through a temporary sibling and rename it into place
///
/// On any failure the temporary file is removed and `path` is left as it was.
pub fn write_atomic<E, F>(path: &Path, write: F) -> Result<(), E>
where
    E: From<io::Error>,
    F: FnOnce(&mut BufWriter<File>) -> Result<(), E>,
{
    let tmp_path = temp_path_for(path);
    let result = (|| -> Result<(), E> {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        write(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if result.is_err()
        && let Err(e) = std::fs::remove_file(&tmp_path)
        && e.kind() != io::ErrorKind::NotFound
    {
        warn!(path = %tmp_path.display(), error = %e, "Failed to remove temporary file");
    }
    result
}

/// Write a flat numeric array as a NumPy `.npy` file
pub fn write_npy<T>(path: &Path, values: Vec<T>) -> io::Result<()>
where
    T: ndarray_npy::WritableElement,
{
    let array = Array1::from_vec(values);
    write_atomic(path, |writer| {
        array.write_npy(writer).map_err(io::Error::other)
    })?;
    debug!(path = %path.display(), len = array.len(), "Wrote numeric array");
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_file_name() {
        assert_eq!(snapshot_file_name(0, "npy"), "000000.npy");
        assert_eq!(snapshot_file_name(42, "di"), "000042.di");
        assert_eq!(snapshot_file_name(1_234_567, "npy"), "1234567.npy");
    }

    #[test]
    fn test_averaged_file_name() {
        let start = Local.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let end = Local.with_ymd_and_hms(2024, 3, 5, 8, 8, 9).unwrap();
        assert_eq!(
            averaged_file_name(&start, &end, 1800),
            "240305070809-240305080809-1800.npy"
        );
    }

    #[test]
    fn test_write_atomic_failure_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let result: io::Result<()> = write_atomic(&path, |writer| {
            writer.write_all(b"partial")?;
            Err(io::Error::other("boom"))
        });
        assert!(result.is_err());
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_create_session_dir() {
        let dir = tempfile::tempdir().unwrap();
        let start = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let session = create_session_dir(dir.path(), &start).unwrap();
        assert!(session.is_dir());
        assert!(session.ends_with("20240102-030405"));
    }

    #[test]
    fn test_create_session_dir_same_second() {
        let dir = tempfile::tempdir().unwrap();
        let start = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let first = create_session_dir(dir.path(), &start).unwrap();
        let second = create_session_dir(dir.path(), &start).unwrap();
        let third = create_session_dir(dir.path(), &start).unwrap();

        assert!(first.ends_with("20240102-030405"));
        assert!(second.ends_with("20240102-030405-1"));
        assert!(third.ends_with("20240102-030405-2"));
    }
}
