use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use app_settings::AppSettings;
use clap::Args;
use core_types::{ImageSource, PlacementRequest};
use engine::{DirectoryResolver, MaskStyle, SkippedItem};
use records::{ArtifactStore, GenerationNames, GenerationRecord, SavedGeneration, SkipNote, Stamp};
use serde_json::Value;

use crate::options::{build_engine, engine_options};

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// JSON placement request as submitted by the client
    /// (`living_room_image`, `furniture_items`, `canvas_bg_width`, `canvas_bg_height`).
    #[arg(long, value_name = "FILE")]
    pub placements: PathBuf,

    /// Room photo. Defaults to `living_room_image` next to the placements file.
    #[arg(long, value_name = "FILE")]
    pub background: Option<PathBuf>,

    /// Sprite library. Defaults to the configured furniture directory.
    #[arg(long, value_name = "DIR")]
    pub furniture_dir: Option<PathBuf>,

    /// Output directory. Defaults to the configured output directory.
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// binary or feathered.
    #[arg(long, value_name = "STYLE")]
    pub mask_style: Option<MaskStyle>,

    /// JPEG quality for both artifacts (1-100).
    #[arg(long, value_name = "1-100", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,
}

pub fn run(args: &ComposeArgs, settings: &AppSettings, verbose: bool) -> Result<SavedGeneration> {
    let payload = fs::read_to_string(&args.placements)
        .with_context(|| format!("failed to read {}", args.placements.display()))?;
    let raw: Value = serde_json::from_str(&payload)
        .with_context(|| format!("{} is not valid JSON", args.placements.display()))?;
    let request: PlacementRequest = serde_json::from_value(raw.clone())
        .with_context(|| format!("{} is not a placement request", args.placements.display()))?;

    let background = resolve_background(args, &request)?;
    let background_bytes = fs::read(&background)
        .with_context(|| format!("failed to read background {}", background.display()))?;

    let mut options = engine_options(settings)?;
    if let Some(style) = args.mask_style {
        options.mask_style = style;
    }
    if let Some(quality) = args.quality {
        options.jpeg_quality = quality;
    }
    let engine = build_engine(options, verbose);

    let furniture_dir = args
        .furniture_dir
        .clone()
        .unwrap_or_else(|| settings.furniture_path());
    let resolver = DirectoryResolver::new(furniture_dir);

    let outcome = engine
        .generate_pair(
            &ImageSource::bytes(background.display().to_string(), background_bytes.clone()),
            &request,
            &resolver,
        )
        .with_context(|| format!("failed to load background {}", background.display()))?;

    let skipped = outcome.all_skips();
    for item in &skipped {
        eprintln!("warning: skipped {item}");
    }
    let normalized = outcome.decision.normalized;
    let composite = outcome.composite.context("composite generation failed")?;
    let mask = outcome.mask.context("mask generation failed")?;

    let stamp = Stamp::now();
    let names = GenerationNames::new(stamp);
    let record = GenerationRecord {
        timestamp: stamp.iso(),
        living_room: file_label(&background),
        furniture_count: request.furniture_items.len(),
        composite_image: names.composite.clone(),
        mask_image: names.mask.clone(),
        furniture_details: raw
            .get("furniture_items")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())),
        skipped: skipped.iter().map(skip_note).collect(),
        background_blake3: Some(records::fingerprint(&background_bytes)),
        normalized_size: Some([normalized.width, normalized.height]),
    };

    let out_dir = args.out.clone().unwrap_or_else(|| settings.output_path());
    let store = ArtifactStore::new(&out_dir, settings.mask_path());
    let saved = store
        .save_generation(&names, &composite.bytes, &mask.bytes, &record)
        .with_context(|| format!("failed to write artifacts to {}", out_dir.display()))?;
    Ok(saved)
}

fn resolve_background(args: &ComposeArgs, request: &PlacementRequest) -> Result<PathBuf> {
    if let Some(path) = &args.background {
        return Ok(path.clone());
    }
    let name = request
        .living_room_image
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| anyhow!("no --background given and the request names no living_room_image"))?;
    let base = args.placements.parent().unwrap_or_else(|| Path::new("."));
    Ok(base.join(name))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn skip_note(item: &SkippedItem) -> SkipNote {
    SkipNote {
        index: item.index,
        label: item.label.clone(),
        reason: item.reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn writes_composite_mask_and_record() {
        let dir = tempdir().unwrap();
        let furniture = dir.path().join("furniture");
        fs::create_dir_all(&furniture).unwrap();
        RgbaImage::from_pixel(16, 16, Rgba([200, 30, 30, 255]))
            .save(furniture.join("sofa.png"))
            .unwrap();
        RgbImage::from_pixel(400, 300, Rgb([90, 90, 90]))
            .save(dir.path().join("room.png"))
            .unwrap();

        let placements = dir.path().join("request.json");
        fs::write(
            &placements,
            r#"{
                "living_room_image": "room.png",
                "furniture_items": [
                    {"name": "sofa.png", "x": 100, "y": 100, "width": 50, "height": 50, "rotation": 0},
                    {"name": "missing.png", "x": 0, "y": 0}
                ],
                "canvas_bg_width": 800,
                "canvas_bg_height": 600
            }"#,
        )
        .unwrap();

        let settings = AppSettings {
            data_root: dir.path().to_path_buf(),
            ..AppSettings::default()
        };
        let args = ComposeArgs {
            placements,
            background: None,
            furniture_dir: None,
            out: None,
            mask_style: None,
            quality: Some(90),
        };

        let saved = run(&args, &settings, false).unwrap();
        assert!(saved.composite.starts_with(dir.path().join("output")));

        let composite = image::open(&saved.composite).unwrap();
        assert_eq!((composite.width(), composite.height()), (933, 700));
        let mask = image::open(&saved.mask).unwrap().to_luma8();
        assert!(mask.get_pixel(140, 140)[0] > 200);
        assert!(mask.get_pixel(600, 600)[0] < 50);

        let record: GenerationRecord =
            serde_json::from_slice(&fs::read(&saved.record).unwrap()).unwrap();
        assert_eq!(record.living_room, "room.png");
        assert_eq!(record.furniture_count, 2);
        assert_eq!(record.furniture_details[1]["name"], "missing.png");
        assert_eq!(record.skipped.len(), 1);
        assert_eq!(record.skipped[0].index, 1);
        assert_eq!(record.normalized_size, Some([933, 700]));
    }

    #[test]
    fn request_without_background_is_rejected() {
        let dir = tempdir().unwrap();
        let placements = dir.path().join("request.json");
        fs::write(&placements, r#"{"furniture_items": []}"#).unwrap();
        let args = ComposeArgs {
            placements,
            background: None,
            furniture_dir: None,
            out: None,
            mask_style: None,
            quality: None,
        };
        let err = run(&args, &AppSettings::default(), false).unwrap_err();
        assert!(err.to_string().contains("living_room_image"));
    }
}
