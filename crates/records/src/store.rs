use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::naming::{GenerationNames, StrokeNames};
use crate::record::{GenerationRecord, StrokeRecord};
use crate::{RecordError, Result};

/// Where finished artifacts land. Composite/mask pairs and their records go
/// to `output_dir`; stroke submissions go to `mask_dir`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
    mask_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedGeneration {
    pub composite: PathBuf,
    pub mask: PathBuf,
    pub record: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedStroke {
    pub pure_mask: PathBuf,
    pub annotated: PathBuf,
    pub record: PathBuf,
}

impl ArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>, mask_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            mask_dir: mask_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn mask_dir(&self) -> &Path {
        &self.mask_dir
    }

    pub fn save_generation(
        &self,
        names: &GenerationNames,
        composite: &[u8],
        mask: &[u8],
        record: &GenerationRecord,
    ) -> Result<SavedGeneration> {
        fs::create_dir_all(&self.output_dir)?;
        let saved = SavedGeneration {
            composite: self.output_dir.join(&names.composite),
            mask: self.output_dir.join(&names.mask),
            record: self.output_dir.join(&names.record),
        };
        let record = serde_json::to_vec_pretty(record)?;
        write_all_new(&[
            (&saved.composite, composite),
            (&saved.mask, mask),
            (&saved.record, record.as_slice()),
        ])?;
        Ok(saved)
    }

    pub fn save_stroke(
        &self,
        names: &StrokeNames,
        pure_mask: &[u8],
        annotated: &[u8],
        record: &StrokeRecord,
    ) -> Result<SavedStroke> {
        fs::create_dir_all(&self.mask_dir)?;
        let saved = SavedStroke {
            pure_mask: self.mask_dir.join(&names.pure_mask),
            annotated: self.mask_dir.join(&names.annotated),
            record: self.mask_dir.join(&names.record),
        };
        let record = serde_json::to_vec_pretty(record)?;
        write_all_new(&[
            (&saved.pure_mask, pure_mask),
            (&saved.annotated, annotated),
            (&saved.record, record.as_slice()),
        ])?;
        Ok(saved)
    }
}

/// Write a set of files that belong together. On failure, files already
/// written by this call are removed so the same names can be retried.
fn write_all_new(files: &[(&PathBuf, &[u8])]) -> Result<()> {
    for (done, (path, bytes)) in files.iter().enumerate() {
        if let Err(err) = write_new(path, bytes) {
            for (written, _) in &files[..done] {
                if let Err(remove_err) = fs::remove_file(written) {
                    warn!("Could not remove {}: {remove_err}", written.display());
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|err| match err.kind() {
            ErrorKind::AlreadyExists => RecordError::AlreadyExists(path.to_path_buf()),
            _ => RecordError::Io(err),
        })?;
    if let Err(err) = file.write_all(bytes) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(err.into());
    }
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::Stamp;
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::tempdir;

    fn stamp(second: u32) -> Stamp {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(7, 5, second))
            .unwrap();
        Stamp::from_naive(at)
    }

    fn record(names: &GenerationNames) -> GenerationRecord {
        GenerationRecord {
            timestamp: "2024-03-09T07:05:01".into(),
            living_room: "room.jpg".into(),
            furniture_count: 0,
            composite_image: names.composite.clone(),
            mask_image: names.mask.clone(),
            furniture_details: json!([]),
            skipped: Vec::new(),
            background_blake3: None,
            normalized_size: None,
        }
    }

    #[test]
    fn generation_files_land_in_output_dir() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("output"), dir.path().join("masks"));
        let names = GenerationNames::new(stamp(1));

        let saved = store
            .save_generation(&names, b"jpeg-a", b"jpeg-b", &record(&names))
            .unwrap();
        assert_eq!(fs::read(&saved.composite).unwrap(), b"jpeg-a");
        assert_eq!(fs::read(&saved.mask).unwrap(), b"jpeg-b");
        assert!(saved.record.starts_with(store.output_dir()));

        let written: GenerationRecord =
            serde_json::from_slice(&fs::read(&saved.record).unwrap()).unwrap();
        assert_eq!(written, record(&names));
    }

    #[test]
    fn same_stamp_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), dir.path());
        let names = GenerationNames::new(stamp(1));
        store
            .save_generation(&names, b"one", b"one", &record(&names))
            .unwrap();

        let err = store
            .save_generation(&names, b"two", b"two", &record(&names))
            .unwrap_err();
        assert!(matches!(err, RecordError::AlreadyExists(_)));
        assert_eq!(fs::read(dir.path().join(&names.composite)).unwrap(), b"one");
    }

    #[test]
    fn failed_save_removes_partial_files() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), dir.path());
        let names = GenerationNames::new(stamp(4));
        fs::write(dir.path().join(&names.record), b"stale").unwrap();

        let err = store
            .save_generation(&names, b"c", b"m", &record(&names))
            .unwrap_err();
        assert!(matches!(err, RecordError::AlreadyExists(_)));
        assert!(!dir.path().join(&names.composite).exists());
        assert!(!dir.path().join(&names.mask).exists());
        assert_eq!(fs::read(dir.path().join(&names.record)).unwrap(), b"stale");

        fs::remove_file(dir.path().join(&names.record)).unwrap();
        let saved = store
            .save_generation(&names, b"c", b"m", &record(&names))
            .unwrap();
        assert_eq!(fs::read(&saved.composite).unwrap(), b"c");
    }

    #[test]
    fn stroke_files_land_in_mask_dir() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("output"), dir.path().join("masks"));
        let names = StrokeNames::new(Path::new("room.png"), stamp(3));
        let record = StrokeRecord {
            timestamp: stamp(3).iso(),
            background: "room.png".into(),
            pure_mask_image: names.pure_mask.clone(),
            annotated_image: names.annotated.clone(),
            painted_pixels: 10,
            total_pixels: 100,
            mean_alpha: 128.0,
            most_common_alpha: Some(128),
            transparency_percentage: 49.8,
            stroke_resized: false,
            background_blake3: None,
        };

        let saved = store.save_stroke(&names, b"pure", b"scene", &record).unwrap();
        assert!(saved.pure_mask.starts_with(store.mask_dir()));
        assert_eq!(fs::read(&saved.annotated).unwrap(), b"scene");

        let written: StrokeRecord =
            serde_json::from_slice(&fs::read(&saved.record).unwrap()).unwrap();
        assert_eq!(written, record);
        assert!(!store.output_dir().exists());
    }
}
