use core_types::{Dimensions, PlacementItem};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

use crate::codec;
use crate::events::{ArtifactKind, EngineCallbacks, EngineEvent};
use crate::layers::{clip, prepare_layers};
use crate::report::SkippedItem;
use crate::Result;

/// Flattened background-plus-sprites image and the placements left out of it.
#[derive(Debug, Clone)]
pub struct CompositeOutput {
    pub image: RgbImage,
    pub skipped: Vec<SkippedItem>,
}

impl CompositeOutput {
    pub fn dimensions(&self) -> Dimensions {
        self.image.dimensions().into()
    }

    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        codec::encode_jpeg(&DynamicImage::ImageRgb8(self.image.clone()), quality)
    }
}

/// Paint `items` over `background` in list order (first = bottom-most), then
/// flatten onto opaque white.
pub fn composite(
    background: &DynamicImage,
    items: &[PlacementItem],
    callbacks: &EngineCallbacks,
) -> Result<CompositeOutput> {
    let mut canvas = background.to_rgba8();
    let (layers, skipped) = prepare_layers(items, callbacks)?;

    for layer in &layers {
        paste_through_alpha(&mut canvas, &layer.image, layer.x, layer.y);
    }

    let image = flatten_on_white(&canvas);
    callbacks.emit(EngineEvent::ArtifactRendered {
        kind: ArtifactKind::Composite,
        dimensions: image.dimensions().into(),
        skipped: skipped.len(),
    });
    Ok(CompositeOutput { image, skipped })
}

/// Blend `layer` into `canvas`, weighted by the layer's own alpha: color is
/// mixed proportionally and coverage is combined "over" style. Off-canvas
/// parts are dropped.
pub fn paste_through_alpha(canvas: &mut RgbaImage, layer: &RgbaImage, x: i64, y: i64) {
    let Some((src_x, src_y, dst_x, dst_y, width, height)) =
        clip(canvas.dimensions(), layer.dimensions(), x, y)
    else {
        return;
    };

    for row in 0..height {
        for col in 0..width {
            let src = layer.get_pixel(src_x + col, src_y + row);
            let alpha = src[3] as u32;
            if alpha == 0 {
                continue;
            }
            let dst = canvas.get_pixel_mut(dst_x + col, dst_y + row);
            if alpha == 255 {
                *dst = *src;
                continue;
            }
            *dst = Rgba([
                blend_channel(src[0], dst[0], alpha),
                blend_channel(src[1], dst[1], alpha),
                blend_channel(src[2], dst[2], alpha),
                // Coverage accumulates: a half-transparent sprite never thins
                // an opaque background.
                blend_channel(255, dst[3], alpha),
            ]);
        }
    }
}

/// `(src * a + dst * (255 - a)) / 255`, rounded.
pub(crate) fn blend_channel(src: u8, dst: u8, alpha: u32) -> u8 {
    ((src as u32 * alpha + dst as u32 * (255 - alpha) + 127) / 255) as u8
}

/// Drop transparency by compositing over white.
pub fn flatten_on_white(canvas: &RgbaImage) -> RgbImage {
    let mut out = RgbImage::new(canvas.width(), canvas.height());
    for (dst, src) in out.pixels_mut().zip(canvas.pixels()) {
        let alpha = src[3] as u32;
        *dst = Rgb([
            blend_channel(src[0], 255, alpha),
            blend_channel(src[1], 255, alpha),
            blend_channel(src[2], 255, alpha),
        ]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::source_from_rgba;
    use core_types::ImageSource;

    fn background(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 40, 40])))
    }

    fn placed(sprite: &RgbaImage, label: &str, x: i64, y: i64) -> PlacementItem {
        PlacementItem {
            sprite: source_from_rgba(label, sprite).unwrap(),
            label: label.into(),
            x,
            y,
            width: sprite.width(),
            height: sprite.height(),
            rotation: 0.0,
        }
    }

    #[test]
    fn opaque_sprite_lands_at_its_position() {
        let mut sprite = RgbaImage::from_pixel(10, 10, Rgba([200, 0, 0, 255]));
        sprite.put_pixel(0, 0, Rgba([0, 250, 0, 255]));
        let out = composite(
            &background(50, 40),
            &[placed(&sprite, "sofa", 12, 7)],
            &EngineCallbacks::default(),
        )
        .unwrap();

        assert_eq!(out.dimensions(), Dimensions::new(50, 40));
        assert_eq!(out.image.get_pixel(12, 7), &Rgb([0, 250, 0]));
        assert_eq!(out.image.get_pixel(21, 16), &Rgb([200, 0, 0]));
        assert_eq!(out.image.get_pixel(22, 17), &Rgb([40, 40, 40]));
        assert_eq!(out.image.get_pixel(11, 7), &Rgb([40, 40, 40]));
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn later_items_paint_over_earlier_ones() {
        let a = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]));
        let b = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255]));
        let out = composite(
            &background(20, 20),
            &[placed(&a, "a", 4, 4), placed(&b, "b", 6, 6)],
            &EngineCallbacks::default(),
        )
        .unwrap();

        assert_eq!(out.image.get_pixel(5, 5), &Rgb([255, 0, 0]));
        assert_eq!(out.image.get_pixel(7, 7), &Rgb([0, 0, 255]));
        assert_eq!(out.image.get_pixel(13, 13), &Rgb([0, 0, 255]));
    }

    #[test]
    fn transparent_pixels_leave_background_and_partial_alpha_blends() {
        let mut sprite = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 0]));
        sprite.put_pixel(1, 1, Rgba([240, 240, 240, 128]));
        let out = composite(
            &background(10, 10),
            &[placed(&sprite, "ghost", 2, 2)],
            &EngineCallbacks::default(),
        )
        .unwrap();

        assert_eq!(out.image.get_pixel(2, 2), &Rgb([40, 40, 40]));
        // (240 * 128 + 40 * 127 + 127) / 255 = 140
        assert_eq!(out.image.get_pixel(3, 3), &Rgb([140, 140, 140]));
    }

    #[test]
    fn transparent_background_flattens_to_white() {
        let clear = DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 6, Rgba([9, 9, 9, 0])));
        let out = composite(&clear, &[], &EngineCallbacks::default()).unwrap();
        assert!(out.image.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn off_canvas_and_missing_items_do_not_abort() {
        let sprite = RgbaImage::from_pixel(6, 6, Rgba([0, 0, 0, 255]));
        let missing = PlacementItem {
            sprite: ImageSource::path("/gone/chair.png"),
            ..placed(&sprite, "chair", 0, 0)
        };
        let out = composite(
            &background(10, 10),
            &[missing, placed(&sprite, "edge", -3, 7)],
            &EngineCallbacks::default(),
        )
        .unwrap();

        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].index, 0);
        assert_eq!(out.image.get_pixel(0, 9), &Rgb([0, 0, 0]));
        assert_eq!(out.image.get_pixel(3, 9), &Rgb([40, 40, 40]));
        assert_eq!(out.image.get_pixel(0, 6), &Rgb([40, 40, 40]));
    }

    #[test]
    fn encoded_composite_is_jpeg() {
        let out = composite(&background(16, 16), &[], &EngineCallbacks::default()).unwrap();
        let bytes = out.encode_jpeg(95).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
