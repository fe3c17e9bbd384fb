use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use app_settings::AppSettings;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::Args;
use core_types::file_kind::{extension_for_mime, sniff_mime};
use core_types::ImageSource;
use engine::DimensionPolicy;
use records::{ArtifactStore, SavedStroke, Stamp, StrokeNames, StrokeRecord};

use crate::options::{build_engine, engine_options};

#[derive(Args, Debug)]
pub struct BlendArgs {
    /// Room photo the stroke was drawn over.
    #[arg(long, value_name = "FILE")]
    pub background: PathBuf,

    #[command(flatten)]
    pub stroke: StrokeInput,

    /// Directory for the pure mask and annotated scene. Defaults to the
    /// configured mask directory.
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Fail instead of resampling when stroke and background sizes differ.
    #[arg(long)]
    pub strict: bool,

    /// Blend onto the background as-is, without the minimum-height upscale.
    #[arg(long)]
    pub no_normalize: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct StrokeInput {
    /// Stroke layer as an image file.
    #[arg(long, value_name = "FILE")]
    pub stroke: Option<PathBuf>,

    /// Text file holding the stroke as a `data:image/png;base64,...` URL.
    #[arg(long, value_name = "FILE")]
    pub stroke_data_url: Option<PathBuf>,
}

impl StrokeInput {
    fn load(&self) -> Result<Vec<u8>> {
        if let Some(path) = &self.stroke {
            return fs::read(path).with_context(|| format!("failed to read {}", path.display()));
        }
        if let Some(path) = &self.stroke_data_url {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            return decode_data_url(&text)
                .with_context(|| format!("{} does not hold an image data URL", path.display()));
        }
        bail!("either --stroke or --stroke-data-url is required")
    }
}

/// Decode `data:<mime>;base64,<payload>`; a bare base64 payload is accepted too.
pub fn decode_data_url(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    let (declared, payload) = match text.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| anyhow!("data URL has no ',' separator"))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| anyhow!("only base64 data URLs are supported"))?;
            (Some(mime), payload)
        }
        None => (None, text),
    };

    if let Some(mime) = declared {
        if extension_for_mime(mime).is_none() {
            bail!("unsupported image type {mime}");
        }
    }

    let bytes = BASE64
        .decode(payload.trim().as_bytes())
        .context("base64 decode failed")?;
    if sniff_mime(&bytes).is_none() {
        bail!("decoded payload is not a PNG, JPEG or GIF image");
    }
    Ok(bytes)
}

pub fn run(args: &BlendArgs, settings: &AppSettings, verbose: bool) -> Result<SavedStroke> {
    let stroke_bytes = args.stroke.load()?;
    let background_bytes = fs::read(&args.background)
        .with_context(|| format!("failed to read background {}", args.background.display()))?;

    let mut options = engine_options(settings)?;
    if args.strict {
        options.stroke_dimensions = DimensionPolicy::Strict;
    }
    if args.no_normalize {
        options.normalize_stroke_background = false;
    }
    let engine = build_engine(options, verbose);

    let blend = engine
        .blend_stroke(
            &ImageSource::bytes(args.background.display().to_string(), background_bytes.clone()),
            &ImageSource::bytes("stroke", stroke_bytes.clone()),
        )
        .context("stroke blend failed")?;
    let annotated = blend.encode_png()?;

    let stamp = Stamp::now();
    let names = StrokeNames::new(&args.background, stamp);
    let stats = blend.stats;
    let record = StrokeRecord {
        timestamp: stamp.iso(),
        background: args.background.display().to_string(),
        pure_mask_image: names.pure_mask.clone(),
        annotated_image: names.annotated.clone(),
        painted_pixels: stats.painted_pixels,
        total_pixels: stats.total_pixels,
        mean_alpha: stats.mean_alpha,
        most_common_alpha: stats.dominant_alpha,
        transparency_percentage: stats.transparency_percent,
        stroke_resized: blend.stroke_resized,
        background_blake3: Some(records::fingerprint(&background_bytes)),
    };

    let out_dir = args.out.clone().unwrap_or_else(|| settings.mask_path());
    let store = ArtifactStore::new(settings.output_path(), &out_dir);
    store
        .save_stroke(&names, &stroke_bytes, &annotated, &record)
        .with_context(|| format!("failed to write artifacts to {}", out_dir.display()))
}
