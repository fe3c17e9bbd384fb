use core_types::{ImageSource, PlacementItem};
use image::RgbaImage;

use crate::codec;
use crate::coords::MAX_SPRITE_PIXELS;
use crate::events::{EngineCallbacks, EngineEvent};
use crate::report::{SkipReason, SkippedItem};
use crate::transform::{resize_exact, rotate_expand};
use crate::{EngineError, Result};

/// A sprite after resize and rotation, ready to paste at (`x`, `y`).
#[derive(Debug, Clone)]
pub struct PreparedLayer {
    pub index: usize,
    pub image: RgbaImage,
    pub x: i64,
    pub y: i64,
}

/// Resize to the placement box, then rotate by the negated authored angle.
///
/// The client authors rotation clockwise-positive while `rotate_expand` takes
/// counter-clockwise degrees.
// TODO: confirm the client canvas angle convention; the negation is kept for
// compatibility with existing placement records.
pub fn prepare_sprite(sprite: RgbaImage, item: &PlacementItem, index: usize) -> PreparedLayer {
    let resized = resize_exact(sprite, item.width, item.height);
    let image = if item.rotation != 0.0 {
        rotate_expand(&resized, -item.rotation)
    } else {
        resized
    };
    PreparedLayer {
        index,
        image,
        x: item.x,
        y: item.y,
    }
}

/// Load and transform every placement in order. Missing sprite files and
/// zero-sized or oversized boxes become skip diagnostics; undecodable sprites
/// are fatal.
pub fn prepare_layers(
    items: &[PlacementItem],
    callbacks: &EngineCallbacks,
) -> Result<(Vec<PreparedLayer>, Vec<SkippedItem>)> {
    let mut layers = Vec::with_capacity(items.len());
    let mut skipped = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let skip = |reason: SkipReason| SkippedItem {
            index,
            label: item.label.clone(),
            reason,
        };

        if item.width == 0 || item.height == 0 {
            let entry = skip(SkipReason::InvalidPlacement(format!(
                "size {}x{}",
                item.width, item.height
            )));
            callbacks.emit(EngineEvent::ItemSkipped(entry.clone()));
            skipped.push(entry);
            continue;
        }
        if item.width as u64 * item.height as u64 > MAX_SPRITE_PIXELS {
            let entry = skip(SkipReason::InvalidPlacement(format!(
                "size {}x{} exceeds the sprite pixel budget",
                item.width, item.height
            )));
            callbacks.emit(EngineEvent::ItemSkipped(entry.clone()));
            skipped.push(entry);
            continue;
        }

        let sprite = match codec::decode(&item.sprite) {
            Ok(sprite) => sprite.to_rgba8(),
            Err(EngineError::MissingSourceAsset { path }) => {
                let entry = skip(SkipReason::MissingSourceAsset(path));
                callbacks.emit(EngineEvent::ItemSkipped(entry.clone()));
                skipped.push(entry);
                continue;
            }
            Err(err) => return Err(err),
        };

        layers.push(prepare_sprite(sprite, item, index));
    }

    Ok((layers, skipped))
}

/// Overlap between a `src_w`×`src_h` layer at (`x`, `y`) and a canvas.
///
/// Returns `(src_x, src_y, dst_x, dst_y, width, height)` or `None` when the
/// layer lies entirely off-canvas.
pub(crate) fn clip(
    canvas: (u32, u32),
    layer: (u32, u32),
    x: i64,
    y: i64,
) -> Option<(u32, u32, u32, u32, u32, u32)> {
    let (cw, ch) = (canvas.0 as i64, canvas.1 as i64);
    let (lw, lh) = (layer.0 as i64, layer.1 as i64);

    let left = x.max(0);
    let top = y.max(0);
    let right = x.saturating_add(lw).min(cw);
    let bottom = y.saturating_add(lh).min(ch);
    if left >= right || top >= bottom {
        return None;
    }

    Some((
        (left - x) as u32,
        (top - y) as u32,
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    ))
}

/// Convenience for tests and callers that already hold a sprite in memory.
pub fn source_from_rgba(label: &str, image: &RgbaImage) -> Result<ImageSource> {
    let bytes = codec::encode_png(&image::DynamicImage::ImageRgba8(image.clone()))?;
    Ok(ImageSource::bytes(label, bytes))
}
