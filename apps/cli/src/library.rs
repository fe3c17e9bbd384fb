use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use core_types::file_kind::is_accepted_image_path;
use core_types::{Dimensions, ImageSource};
use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::WalkDir;

pub const METADATA_FILE: &str = "furniture_metadata.json";
const DEFAULT_KIND: &str = "sofa";

#[derive(Args, Debug)]
pub struct LibraryArgs {
    /// Sprite library to list. Defaults to the configured furniture directory.
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Only list items of this style (case-insensitive).
    #[arg(long)]
    pub style: Option<String>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// One sprite available for placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FurnitureEntry {
    /// File name inside the library root; this is what placements reference.
    pub name: String,
    pub path: PathBuf,
    pub display_name: String,
    pub style: Option<String>,
    /// Real-world length in metres, when catalogued.
    pub length: Option<f64>,
    pub width: Option<f64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub dimensions: Option<Dimensions>,
}

#[derive(Debug, Default, Deserialize)]
struct MetadataFile {
    #[serde(default)]
    furniture: Vec<FurnitureMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
struct FurnitureMetadata {
    filename: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    length: Option<f64>,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Catalogue entries keyed by file name. A missing or unreadable metadata
/// file is not an error; entries then fall back to file-name parsing.
fn load_metadata(dir: &Path) -> HashMap<String, FurnitureMetadata> {
    let path = dir.join(METADATA_FILE);
    let Ok(content) = fs::read_to_string(&path) else {
        return HashMap::new();
    };
    match serde_json::from_str::<MetadataFile>(&content) {
        Ok(file) => file
            .furniture
            .into_iter()
            .map(|item| (item.filename.clone(), item))
            .collect(),
        Err(err) => {
            warn!("Ignoring unreadable {}: {err}", path.display());
            HashMap::new()
        }
    }
}

/// List sprites with an accepted extension directly under `dir`.
/// Subdirectories are skipped; placement names resolve against the root only.
pub fn scan_library(dir: &Path) -> Result<Vec<FurnitureEntry>> {
    let metadata = load_metadata(dir);
    let mut entries = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|res| res.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if !is_accepted_image_path(&path) {
            continue;
        }

        let file_name = path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_string();
        let stem = path
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_string();
        let name = file_name.clone();

        let meta = metadata.get(&file_name);
        // Legacy naming: `<type>_<style>_....png`.
        let style = meta
            .and_then(|m| m.style.clone())
            .or_else(|| stem.split('_').nth(1).map(str::to_string));

        let dimensions = engine::codec::probe_dimensions(&ImageSource::path(&path)).ok();
        if dimensions.is_none() {
            warn!("Could not read dimensions of {}", path.display());
        }

        entries.push(FurnitureEntry {
            name,
            display_name: meta
                .and_then(|m| m.display_name.clone())
                .unwrap_or_else(|| stem.clone()),
            style,
            length: meta.and_then(|m| m.length),
            width: meta.and_then(|m| m.width),
            kind: meta
                .and_then(|m| m.kind.clone())
                .unwrap_or_else(|| DEFAULT_KIND.to_string()),
            description: meta
                .and_then(|m| m.description.clone())
                .unwrap_or_default(),
            dimensions,
            path,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Entries without a known style never match a style filter.
pub fn filter_by_style(entries: Vec<FurnitureEntry>, style: &str) -> Vec<FurnitureEntry> {
    entries
        .into_iter()
        .filter(|entry| {
            entry
                .style
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(style))
        })
        .collect()
}

pub fn run(args: &LibraryArgs, furniture_dir: &Path) -> Result<()> {
    let dir = args.dir.as_deref().unwrap_or(furniture_dir);
    let mut entries = scan_library(dir)?;
    if let Some(style) = &args.style {
        entries = filter_by_style(entries, style);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        let size = entry
            .dimensions
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "{:<40} {:>10}  {:<10} {}",
            entry.name,
            size,
            entry.style.as_deref().unwrap_or("-"),
            entry.display_name
        );
    }
    println!("{} item(s) in {}", entries.len(), dir.display());
    Ok(())
}
