use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime};

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Second-resolution local timestamp shared by every file of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp(NaiveDateTime);

impl Stamp {
    pub fn now() -> Self {
        Self::from_local(Local::now())
    }

    pub fn from_local(at: DateTime<Local>) -> Self {
        Self(at.naive_local())
    }

    pub fn from_naive(at: NaiveDateTime) -> Self {
        Self(at)
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    /// ISO-8601 form used inside records.
    pub fn iso(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(STAMP_FORMAT))
    }
}

/// File names for one composite/mask generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationNames {
    pub composite: String,
    pub mask: String,
    pub record: String,
}

impl GenerationNames {
    pub fn new(stamp: Stamp) -> Self {
        Self {
            composite: format!("composite_{stamp}.jpg"),
            mask: format!("mask_{stamp}.jpg"),
            record: format!("record_{stamp}.json"),
        }
    }
}

/// File names for one stroke submission, prefixed by the background's stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrokeNames {
    pub pure_mask: String,
    pub annotated: String,
    pub record: String,
}

impl StrokeNames {
    pub fn new(background: &Path, stamp: Stamp) -> Self {
        let base = background
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "image".to_string());
        Self {
            pure_mask: format!("{base}_pure_mask_{stamp}.png"),
            annotated: format!("{base}_composite_mask_{stamp}.png"),
            record: format!("{base}_stroke_{stamp}.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> Stamp {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(7, 5, 1))
            .unwrap();
        Stamp::from_naive(at)
    }

    #[test]
    fn stamp_formats_with_zero_padding() {
        assert_eq!(stamp().to_string(), "20240309_070501");
        assert_eq!(stamp().iso(), "2024-03-09T07:05:01");
    }

    #[test]
    fn generation_names_share_the_stamp() {
        let names = GenerationNames::new(stamp());
        assert_eq!(names.composite, "composite_20240309_070501.jpg");
        assert_eq!(names.mask, "mask_20240309_070501.jpg");
        assert_eq!(names.record, "record_20240309_070501.json");
    }

    #[test]
    fn stroke_names_use_background_stem() {
        let names = StrokeNames::new(Path::new("/uploads/room 1.jpeg"), stamp());
        assert_eq!(names.pure_mask, "room 1_pure_mask_20240309_070501.png");
        assert_eq!(names.annotated, "room 1_composite_mask_20240309_070501.png");

        let fallback = StrokeNames::new(Path::new(""), stamp());
        assert!(fallback.pure_mask.starts_with("image_pure_mask_"));
    }
}
