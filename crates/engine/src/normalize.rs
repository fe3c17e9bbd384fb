use core_types::Dimensions;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

pub const DEFAULT_MIN_HEIGHT: u32 = 512;
pub const DEFAULT_TARGET_HEIGHT: u32 = 700;

/// Minimum working resolution for background photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizePolicy {
    min_height: u32,
    target_height: u32,
}

impl Default for NormalizePolicy {
    fn default() -> Self {
        Self {
            min_height: DEFAULT_MIN_HEIGHT,
            target_height: DEFAULT_TARGET_HEIGHT,
        }
    }
}

impl NormalizePolicy {
    /// `target_height` is raised to `min_height` if lower, which keeps the
    /// policy idempotent.
    pub fn new(min_height: u32, target_height: u32) -> Self {
        Self {
            min_height,
            target_height: target_height.max(min_height),
        }
    }

    pub fn min_height(&self) -> u32 {
        self.min_height
    }

    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    /// Decide the normalized size without touching pixels.
    pub fn decide(&self, original: Dimensions) -> ResizeDecision {
        if original.height == 0 || original.height >= self.min_height {
            return ResizeDecision {
                original,
                normalized: original,
            };
        }

        let scale = self.target_height as f64 / original.height as f64;
        let width = (original.width as f64 * scale).round().max(1.0) as u32;
        ResizeDecision {
            original,
            normalized: Dimensions::new(width, self.target_height),
        }
    }

    pub fn apply(&self, image: DynamicImage) -> NormalizedBackground {
        let decision = self.decide(image.dimensions().into());
        let image = if decision.upscaled() {
            image.resize_exact(
                decision.normalized.width,
                decision.normalized.height,
                FilterType::Lanczos3,
            )
        } else {
            image
        };
        NormalizedBackground { image, decision }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeDecision {
    pub original: Dimensions,
    pub normalized: Dimensions,
}

impl ResizeDecision {
    pub fn upscaled(&self) -> bool {
        self.original != self.normalized
    }

    pub fn factor(&self) -> f64 {
        if self.original.height == 0 {
            return 1.0;
        }
        self.normalized.height as f64 / self.original.height as f64
    }
}

/// A background after the minimum-height policy ran; the reference space for
/// every placement coordinate.
#[derive(Debug, Clone)]
pub struct NormalizedBackground {
    pub image: DynamicImage,
    pub decision: ResizeDecision,
}

impl NormalizedBackground {
    pub fn dimensions(&self) -> Dimensions {
        self.decision.normalized
    }
}
