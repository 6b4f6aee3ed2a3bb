//! Array + mask persistence collaborator.
//!
//! Results are stored as JSON documents with one primary data plane and
//! any number of auxiliary planes; the engine writes at most one (the
//! invalidity mask). Every save call lands in a fresh timestamped
//! subdirectory (`YYYYMMDD_HHMMSS`, the tracking number) of the target
//! directory, so result sets never collide across runs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::warn;

use align_core::{Mask, Matrix};
use nalgebra::DMatrix;

/// Errors raised by the storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Write target present and overwrite not requested.
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Timestamp(#[from] time::error::Format),
}

#[derive(Serialize, Deserialize)]
struct StoredArray {
    data: Matrix,
    /// Auxiliary planes; the first, if present, is the invalidity mask.
    #[serde(default)]
    planes: Vec<DMatrix<u8>>,
}

/// Timestamp-derived identifier namespacing one saved result set.
pub fn tracking_number() -> Result<String, StorageError> {
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    Ok(OffsetDateTime::now_utc().format(&fmt)?)
}

/// Save an array (and optional mask) under a fresh tracking number.
///
/// Returns the full path of the written file,
/// `directory/YYYYMMDD_HHMMSS/name`.
///
/// # Errors
///
/// [`StorageError::AlreadyExists`] if the target exists and `overwrite`
/// is false.
pub fn save(
    directory: &Path,
    name: &str,
    data: &Matrix,
    mask: Option<&Mask>,
    overwrite: bool,
) -> Result<PathBuf, StorageError> {
    let target_dir = directory.join(tracking_number()?);
    fs::create_dir_all(&target_dir)?;
    write_array(&target_dir.join(name), data, mask, overwrite)
}

fn write_array(
    path: &Path,
    data: &Matrix,
    mask: Option<&Mask>,
    overwrite: bool,
) -> Result<PathBuf, StorageError> {
    if path.exists() && !overwrite {
        return Err(StorageError::AlreadyExists(path.to_path_buf()));
    }
    let stored = StoredArray {
        data: data.clone(),
        planes: mask.map(|m| vec![m.map(u8::from)]).unwrap_or_default(),
    };
    fs::write(path, serde_json::to_vec(&stored)?)?;
    Ok(path.to_path_buf())
}

/// Load an array and its optional mask.
///
/// A file carrying more than one auxiliary plane is not an error: the
/// excess is logged and only the primary plane is returned.
pub fn load(path: &Path) -> Result<(Matrix, Option<Mask>), StorageError> {
    if !path.exists() {
        return Err(StorageError::NotFound(path.to_path_buf()));
    }
    let stored: StoredArray = serde_json::from_slice(&fs::read(path)?)?;
    let mask = match stored.planes.len() {
        0 => None,
        1 => Some(stored.planes[0].map(|v| v != 0)),
        n => {
            warn!(path = %path.display(), planes = n, "more than one auxiliary plane, skipping all");
            None
        }
    };
    Ok((stored.data, mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Matrix {
        Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
    }

    #[test]
    fn save_then_load_round_trips_data_and_mask() {
        let dir = tempdir().unwrap();
        let mut mask = Mask::from_element(2, 3, false);
        mask[(1, 2)] = true;

        let path = save(dir.path(), "result.json", &sample(), Some(&mask), false).unwrap();
        let (data, loaded_mask) = load(&path).unwrap();

        assert_eq!(data, sample());
        assert_eq!(loaded_mask.unwrap(), mask);
    }

    #[test]
    fn save_without_mask_loads_none() {
        let dir = tempdir().unwrap();
        let path = save(dir.path(), "plain.json", &sample(), None, false).unwrap();
        let (data, mask) = load(&path).unwrap();
        assert_eq!(data, sample());
        assert!(mask.is_none());
    }

    #[test]
    fn save_namespaces_by_tracking_number() {
        let dir = tempdir().unwrap();
        let path = save(dir.path(), "result.json", &sample(), None, false).unwrap();
        let subdir = path.parent().unwrap().file_name().unwrap();
        // YYYYMMDD_HHMMSS
        let tn = subdir.to_str().unwrap();
        assert_eq!(tn.len(), 15);
        assert_eq!(tn.as_bytes()[8], b'_');
    }

    #[test]
    fn existing_target_without_overwrite_is_rejected() {
        let dir = tempdir().unwrap();
        let path = save(dir.path(), "result.json", &sample(), None, false).unwrap();

        let again = write_array(&path, &sample(), None, false);
        assert!(matches!(again, Err(StorageError::AlreadyExists(_))));

        let forced = write_array(&path, &sample(), None, true);
        assert!(forced.is_ok());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load(&dir.path().join("absent.json")),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn extra_planes_degrade_to_primary_only() {
        let dir = tempdir().unwrap();
        let stored = StoredArray {
            data: sample(),
            planes: vec![
                DMatrix::from_element(2, 3, 0u8),
                DMatrix::from_element(2, 3, 1u8),
            ],
        };
        let path = dir.path().join("multi.json");
        fs::write(&path, serde_json::to_vec(&stored).unwrap()).unwrap();

        let (data, mask) = load(&path).unwrap();
        assert_eq!(data, sample());
        assert!(mask.is_none());
    }
}
