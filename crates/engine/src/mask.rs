use std::fmt;
use std::str::FromStr;

use core_types::{Dimensions, PlacementItem};
use image::{DynamicImage, GrayImage, Luma, RgbaImage};

use crate::codec;
use crate::compositor::blend_channel;
use crate::events::{ArtifactKind, EngineCallbacks, EngineEvent};
use crate::layers::{clip, prepare_layers};
use crate::report::SkippedItem;
use crate::Result;

pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

/// How partially transparent sprite edges are written into the mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MaskStyle {
    /// Any coverage at all is white.
    #[default]
    Binary,
    /// White is blended in proportionally to sprite alpha.
    Feathered,
}

impl FromStr for MaskStyle {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "binary" => Ok(MaskStyle::Binary),
            "feathered" => Ok(MaskStyle::Feathered),
            other => Err(format!("unknown mask style '{other}' (expected binary or feathered)")),
        }
    }
}

impl fmt::Display for MaskStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskStyle::Binary => f.write_str("binary"),
            MaskStyle::Feathered => f.write_str("feathered"),
        }
    }
}

/// White-on-black coverage of the placed sprites: white marks the region a
/// downstream model may edit.
#[derive(Debug, Clone)]
pub struct MaskOutput {
    pub image: GrayImage,
    pub skipped: Vec<SkippedItem>,
}

impl MaskOutput {
    pub fn dimensions(&self) -> Dimensions {
        self.image.dimensions().into()
    }

    /// Encoded as a three-channel JPEG, which is what fusion models accept.
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let rgb = DynamicImage::ImageLuma8(self.image.clone()).to_rgb8();
        codec::encode_jpeg(&DynamicImage::ImageRgb8(rgb), quality)
    }
}

/// Paint each item's alpha footprint white on a black `canvas`-sized image.
///
/// Uses the same resize/rotate/position pipeline as the compositor, so the
/// two outputs agree on which pixels a sprite covers.
pub fn derive_mask(
    canvas: Dimensions,
    items: &[PlacementItem],
    style: MaskStyle,
    callbacks: &EngineCallbacks,
) -> Result<MaskOutput> {
    let mut mask = GrayImage::from_pixel(canvas.width, canvas.height, Luma([MASK_OFF]));
    let (layers, skipped) = prepare_layers(items, callbacks)?;

    for layer in &layers {
        paint_footprint(&mut mask, &layer.image, layer.x, layer.y, style);
    }

    callbacks.emit(EngineEvent::ArtifactRendered {
        kind: ArtifactKind::Mask,
        dimensions: canvas,
        skipped: skipped.len(),
    });
    Ok(MaskOutput {
        image: mask,
        skipped,
    })
}

pub fn paint_footprint(mask: &mut GrayImage, layer: &RgbaImage, x: i64, y: i64, style: MaskStyle) {
    let Some((src_x, src_y, dst_x, dst_y, width, height)) =
        clip(mask.dimensions(), layer.dimensions(), x, y)
    else {
        return;
    };

    for row in 0..height {
        for col in 0..width {
            let alpha = layer.get_pixel(src_x + col, src_y + row)[3];
            if alpha == 0 {
                continue;
            }
            let dst = mask.get_pixel_mut(dst_x + col, dst_y + row);
            dst[0] = match style {
                MaskStyle::Binary => MASK_ON,
                MaskStyle::Feathered => blend_channel(MASK_ON, dst[0], alpha as u32),
            };
        }
    }
}
