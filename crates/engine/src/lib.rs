use core_types::{Dimensions, ImageSource, PlacementRequest};
use std::path::PathBuf;

pub mod codec;
pub mod compositor;
pub mod coords;
pub mod events;
pub mod layers;
pub mod mask;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod stroke;
pub mod transform;

pub use compositor::CompositeOutput;
pub use coords::{CoordinateMapper, MappedPlacements};
pub use events::{ArtifactKind, EngineCallbacks, EngineEvent};
pub use mask::{MaskOutput, MaskStyle};
pub use normalize::{NormalizePolicy, NormalizedBackground, ResizeDecision};
pub use pipeline::{AssetResolver, DirectoryResolver, EncodedArtifact, PairOutcome};
pub use report::{SkipReason, SkippedItem};
pub use stroke::{DimensionPolicy, StrokeBlend, StrokeStats};

pub const DEFAULT_JPEG_QUALITY: u8 = 95;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source asset not found: {}", path.display())]
    MissingSourceAsset { path: PathBuf },

    #[error("Unsupported image format for {source_name}: {reason}")]
    UnsupportedImageFormat { source_name: String, reason: String },

    #[error("Dimension mismatch: expected {expected}, found {actual}")]
    DimensionMismatch {
        expected: Dimensions,
        actual: Dimensions,
    },

    #[error("Encode error: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Tunables for one engine instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub normalize: NormalizePolicy,
    pub jpeg_quality: u8,
    pub mask_style: MaskStyle,
    /// Run the background through the normalizer before blending a stroke onto it.
    pub normalize_stroke_background: bool,
    pub stroke_dimensions: DimensionPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            normalize: NormalizePolicy::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            mask_style: MaskStyle::default(),
            normalize_stroke_background: true,
            stroke_dimensions: DimensionPolicy::default(),
        }
    }
}

/// Caller-owned entry point to the compositing core.
///
/// Holds no per-request state; one instance can serve any number of
/// sequential or concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct CompositeEngine {
    options: EngineOptions,
    callbacks: EngineCallbacks,
}

impl CompositeEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            callbacks: EngineCallbacks::default(),
        }
    }

    pub fn with_callbacks(mut self, callbacks: EngineCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn callbacks(&self) -> &EngineCallbacks {
        &self.callbacks
    }

    /// Decode a background and apply the minimum-height policy.
    pub fn load_background(&self, source: &ImageSource) -> Result<NormalizedBackground> {
        let image = codec::decode(source)?;
        Ok(self.normalize(image))
    }

    pub fn normalize(&self, image: image::DynamicImage) -> NormalizedBackground {
        let normalized = self.options.normalize.apply(image);
        self.callbacks
            .emit(EngineEvent::BackgroundNormalized(normalized.decision));
        normalized
    }

    /// Build the surface-to-background mapper for a request.
    pub fn mapper_for(&self, request: &PlacementRequest, normalized: Dimensions) -> CoordinateMapper {
        let mapper = CoordinateMapper::new(request.surface(), normalized);
        self.callbacks.emit(EngineEvent::SurfaceMapped {
            scale_x: mapper.scale_x(),
            scale_y: mapper.scale_y(),
            identity_fallback: mapper.is_identity_fallback(),
        });
        mapper
    }

    pub fn composite(
        &self,
        background: &NormalizedBackground,
        items: &[core_types::PlacementItem],
    ) -> Result<CompositeOutput> {
        compositor::composite(&background.image, items, &self.callbacks)
    }

    pub fn mask(&self, canvas: Dimensions, items: &[core_types::PlacementItem]) -> Result<MaskOutput> {
        mask::derive_mask(canvas, items, self.options.mask_style, &self.callbacks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn normalize_reports_decision_through_callbacks() {
        let seen: Arc<Mutex<Vec<EngineEvent>>> = Arc::default();
        let sink = seen.clone();
        let engine = CompositeEngine::default().with_callbacks(EngineCallbacks::new(move |event| {
            sink.lock().unwrap().push(event.clone());
        }));

        let background = image::DynamicImage::ImageRgb8(image::RgbImage::new(400, 300));
        let normalized = engine.normalize(background);
        assert_eq!(normalized.dimensions(), Dimensions::new(933, 700));

        let events = seen.lock().unwrap();
        assert!(matches!(
            events.as_slice(),
            [EngineEvent::BackgroundNormalized(decision)] if decision.upscaled()
        ));
    }

    #[test]
    fn missing_background_is_fatal() {
        let engine = CompositeEngine::default();
        let err = engine
            .load_background(&ImageSource::path("/definitely/not/here.jpg"))
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingSourceAsset { .. }));
    }
}
