use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use app_settings::AppSettings;
use engine::{
    CompositeEngine, DimensionPolicy, EngineCallbacks, EngineOptions, MaskStyle, NormalizePolicy,
};

/// Settings from `path` (or the per-user default) with command-line overrides applied.
pub fn load_settings(path: Option<&Path>, data_root: Option<PathBuf>) -> Result<AppSettings> {
    let mut settings = match path {
        Some(path) => AppSettings::load_from(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?,
        None => AppSettings::load().unwrap_or_default(),
    };
    if let Some(root) = data_root {
        settings.data_root = root;
    }
    settings.validate().context("invalid settings")?;
    Ok(settings)
}

pub fn engine_options(settings: &AppSettings) -> Result<EngineOptions> {
    let mask_style: MaskStyle = settings.mask_style.parse().map_err(|err: String| anyhow!(err))?;
    Ok(EngineOptions {
        normalize: NormalizePolicy::new(settings.min_height, settings.target_height),
        jpeg_quality: settings.jpeg_quality,
        mask_style,
        normalize_stroke_background: settings.normalize_stroke_background,
        stroke_dimensions: if settings.strict_stroke_dimensions {
            DimensionPolicy::Strict
        } else {
            DimensionPolicy::Resize
        },
    })
}

/// With `verbose`, every engine event is echoed to stderr.
pub fn build_engine(options: EngineOptions, verbose: bool) -> CompositeEngine {
    let engine = CompositeEngine::new(options);
    if verbose {
        engine.with_callbacks(EngineCallbacks::new(|event| eprintln!("  {event}")))
    } else {
        engine
    }
}
