use core_types::Dimensions;
use image::{DynamicImage, Rgba, RgbaImage};

use crate::codec;
use crate::events::{ArtifactKind, EngineCallbacks, EngineEvent};
use crate::transform::resize_exact;
use crate::{EngineError, Result};

/// What to do when the stroke layer and the background differ in size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DimensionPolicy {
    /// Resample the stroke to the background size.
    #[default]
    Resize,
    /// Refuse with `DimensionMismatch`.
    Strict,
}

/// Alpha summary of a stroke layer. Only pixels with alpha > 0 count as painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStats {
    pub total_pixels: u64,
    pub painted_pixels: u64,
    /// Mean alpha over painted pixels; 0.0 when nothing is painted.
    pub mean_alpha: f64,
    /// Most frequent painted alpha. Ties go to the higher value.
    pub dominant_alpha: Option<u8>,
    /// `(255 - mean_alpha) / 255 * 100`, two decimals.
    pub transparency_percent: f64,
}

impl StrokeStats {
    pub fn analyze(stroke: &RgbaImage) -> Self {
        let mut histogram = [0u64; 256];
        for pixel in stroke.pixels() {
            histogram[pixel[3] as usize] += 1;
        }

        let total_pixels = stroke.width() as u64 * stroke.height() as u64;
        let painted_pixels: u64 = histogram[1..].iter().sum();
        let alpha_sum: u64 = histogram
            .iter()
            .enumerate()
            .map(|(alpha, count)| alpha as u64 * count)
            .sum();

        let mean_alpha = if painted_pixels == 0 {
            0.0
        } else {
            alpha_sum as f64 / painted_pixels as f64
        };
        let dominant_alpha = (1..=255u8)
            .filter(|alpha| histogram[*alpha as usize] > 0)
            .max_by_key(|alpha| (histogram[*alpha as usize], *alpha));
        let transparency_percent = ((255.0 - mean_alpha) / 255.0 * 100.0 * 100.0).round() / 100.0;

        Self {
            total_pixels,
            painted_pixels,
            mean_alpha,
            dominant_alpha,
            transparency_percent,
        }
    }
}

/// Background with the stroke painted over it. Same size and alpha as the
/// background it came from.
#[derive(Debug, Clone)]
pub struct StrokeBlend {
    pub image: RgbaImage,
    pub stats: StrokeStats,
    pub stroke_resized: bool,
}

impl StrokeBlend {
    pub fn dimensions(&self) -> Dimensions {
        self.image.dimensions().into()
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        codec::encode_png(&DynamicImage::ImageRgba8(self.image.clone()))
    }
}

/// Alpha-blend `stroke` over `background`.
///
/// Per pixel: stroke alpha 0 leaves the background byte-for-byte; otherwise
/// each color channel becomes `(s * a + b * (255 - a)) / 255` truncated, and
/// the background's alpha is kept.
pub fn blend_stroke(
    background: &DynamicImage,
    stroke: &DynamicImage,
    policy: DimensionPolicy,
    callbacks: &EngineCallbacks,
) -> Result<StrokeBlend> {
    let mut image = background.to_rgba8();
    let mut stroke = stroke.to_rgba8();
    let target: Dimensions = image.dimensions().into();
    let actual: Dimensions = stroke.dimensions().into();

    let stroke_resized = target != actual;
    if stroke_resized {
        if policy == DimensionPolicy::Strict {
            return Err(EngineError::DimensionMismatch {
                expected: target,
                actual,
            });
        }
        stroke = resize_exact(stroke, target.width, target.height);
        callbacks.emit(EngineEvent::StrokeResized {
            from: actual,
            to: target,
        });
    }

    let stats = StrokeStats::analyze(&stroke);
    for (dst, src) in image.pixels_mut().zip(stroke.pixels()) {
        blend_pixel(dst, src);
    }

    callbacks.emit(EngineEvent::StrokeBlended(stats));
    callbacks.emit(EngineEvent::ArtifactRendered {
        kind: ArtifactKind::AnnotatedScene,
        dimensions: target,
        skipped: 0,
    });
    Ok(StrokeBlend {
        image,
        stats,
        stroke_resized,
    })
}

fn blend_pixel(dst: &mut Rgba<u8>, src: &Rgba<u8>) {
    let alpha = src[3] as u32;
    if alpha == 0 {
        return;
    }
    for channel in 0..3 {
        dst[channel] = ((src[channel] as u32 * alpha + dst[channel] as u32 * (255 - alpha)) / 255) as u8;
    }
}
