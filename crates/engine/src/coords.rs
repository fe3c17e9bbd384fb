use core_types::{Dimensions, DrawingSurface, ImageSource, PlacementItem, PlacementSpec};

use crate::report::{SkipReason, SkippedItem};

/// Largest placement box, in pixels, a sprite may be resized to.
pub const MAX_SPRITE_PIXELS: u64 = 1 << 24;

/// Converts client drawing-surface coordinates into normalized background pixels.
///
/// The two axes scale independently; an aspect mismatch between surface and
/// photo distorts sprites rather than misplacing them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    scale_x: f64,
    scale_y: f64,
    identity_fallback: bool,
}

impl CoordinateMapper {
    pub fn new(surface: DrawingSurface, normalized: Dimensions) -> Self {
        if !surface.is_known() {
            return Self {
                identity_fallback: true,
                ..Self::identity()
            };
        }
        Self {
            scale_x: normalized.width as f64 / surface.width,
            scale_y: normalized.height as f64 / surface.height,
            identity_fallback: false,
        }
    }

    pub fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            identity_fallback: false,
        }
    }

    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    /// True when the surface size was missing and scale 1.0 was assumed.
    pub fn is_identity_fallback(&self) -> bool {
        self.identity_fallback
    }

    /// Scale and truncate toward zero: `[x, y, width, height]`.
    pub fn map_rect(&self, x: f64, y: f64, width: f64, height: f64) -> [i64; 4] {
        [
            (x * self.scale_x).trunc() as i64,
            (y * self.scale_y).trunc() as i64,
            (width * self.scale_x).trunc() as i64,
            (height * self.scale_y).trunc() as i64,
        ]
    }

    /// Map one client placement. `sprite` is the resolved image for it;
    /// `None` means it carried no usable sprite reference.
    pub fn map_spec(
        &self,
        index: usize,
        spec: &PlacementSpec,
        sprite: Option<ImageSource>,
    ) -> Result<PlacementItem, SkippedItem> {
        let label = spec.label();
        let invalid = |reason: String| SkippedItem {
            index,
            label: label.clone(),
            reason: SkipReason::InvalidPlacement(reason),
        };

        let Some(sprite) = sprite else {
            return Err(invalid("no sprite name or path".to_string()));
        };

        let authored = [spec.x, spec.y, spec.width, spec.height, spec.rotation];
        if authored.iter().any(|value| !value.is_finite()) {
            return Err(invalid("non-finite coordinate".to_string()));
        }

        let [x, y, width, height] = self.map_rect(spec.x, spec.y, spec.width, spec.height);
        if width <= 0 || height <= 0 {
            return Err(invalid(format!("size {width}x{height} after scaling")));
        }
        let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
            return Err(invalid(format!("size {width}x{height} is too large")));
        };
        if width as u64 * height as u64 > MAX_SPRITE_PIXELS {
            return Err(invalid(format!(
                "size {width}x{height} exceeds the sprite pixel budget"
            )));
        }

        Ok(PlacementItem {
            sprite,
            label,
            x,
            y,
            width,
            height,
            rotation: spec.rotation,
        })
    }
}

/// Result of mapping a whole placement list.
#[derive(Debug, Clone, Default)]
pub struct MappedPlacements {
    pub items: Vec<PlacementItem>,
    /// `origins[i]` is the request index `items[i]` came from.
    pub origins: Vec<usize>,
    pub skipped: Vec<SkippedItem>,
}

impl MappedPlacements {
    /// Rewrite indices reported against `items` back to request indices.
    pub fn remap_skips(&self, skipped: Vec<SkippedItem>) -> Vec<SkippedItem> {
        skipped
            .into_iter()
            .map(|mut item| {
                if let Some(origin) = self.origins.get(item.index) {
                    item.index = *origin;
                }
                item
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite() -> Option<ImageSource> {
        Some(ImageSource::path("/lib/sofa.png"))
    }

    #[test]
    fn unknown_surface_maps_identically() {
        let normalized = Dimensions::new(933, 700);
        for surface in [
            DrawingSurface::new(0.0, 600.0),
            DrawingSurface::new(800.0, 0.0),
            DrawingSurface::default(),
        ] {
            let mapper = CoordinateMapper::new(surface, normalized);
            assert!(mapper.is_identity_fallback());
            assert_eq!(mapper.scale_x(), 1.0);
            assert_eq!(mapper.scale_y(), 1.0);
            assert_eq!(mapper.map_rect(12.9, 7.0, 50.0, 40.5), [12, 7, 50, 40]);
        }
    }

    #[test]
    fn scale_factors_are_inverse_to_surface_size() {
        let normalized = Dimensions::new(1400, 700);
        let base = CoordinateMapper::new(DrawingSurface::new(800.0, 600.0), normalized);
        for k in [0.5, 2.0, 3.0, 10.0] {
            let scaled =
                CoordinateMapper::new(DrawingSurface::new(800.0 * k, 600.0 * k), normalized);
            assert!((scaled.scale_x() - base.scale_x() / k).abs() < 1e-12);
            assert!((scaled.scale_y() - base.scale_y() / k).abs() < 1e-12);
        }
    }

    #[test]
    fn right_edge_of_surface_lands_on_right_edge_of_background() {
        let mapper = CoordinateMapper::new(
            DrawingSurface::new(800.0, 600.0),
            Dimensions::new(1400, 700),
        );
        let [x, _, width, _] = mapper.map_rect(744.0, 0.0, 56.0, 10.0);
        assert_eq!(x + width, 1400);
    }

    #[test]
    fn maps_authored_item_into_normalized_space() {
        let mapper = CoordinateMapper::new(
            DrawingSurface::new(800.0, 600.0),
            Dimensions::new(933, 700),
        );
        assert!((mapper.scale_x() - 933.0 / 800.0).abs() < 1e-12);
        assert!((mapper.scale_y() - 700.0 / 600.0).abs() < 1e-12);

        let spec = PlacementSpec::named("sofa.png", 100.0, 100.0, 50.0, 50.0).with_rotation(30.0);
        let item = mapper.map_spec(0, &spec, sprite()).unwrap();
        assert_eq!((item.x, item.y), (116, 116));
        assert_eq!((item.width, item.height), (58, 58));
        assert_eq!(item.rotation, 30.0);
    }

    #[test]
    fn negative_positions_survive_mapping() {
        let mapper = CoordinateMapper::new(
            DrawingSurface::new(100.0, 100.0),
            Dimensions::new(200, 200),
        );
        let spec = PlacementSpec::named("lamp.png", -10.0, -5.5, 20.0, 20.0);
        let item = mapper.map_spec(0, &spec, sprite()).unwrap();
        assert_eq!((item.x, item.y), (-20, -11));
    }

    #[test]
    fn far_off_canvas_positions_saturate_instead_of_wrapping() {
        let mapper = CoordinateMapper::new(
            DrawingSurface::new(800.0, 600.0),
            Dimensions::new(933, 700),
        );
        let far = PlacementSpec::named("sofa.png", 1e30, -1e30, 50.0, 50.0);
        let item = mapper.map_spec(0, &far, sprite()).unwrap();
        assert_eq!((item.x, item.y), (i64::MAX, i64::MIN));

        let beyond = PlacementSpec::named("sofa.png", 5_000.0, 4_000.0, 50.0, 50.0);
        let item = mapper.map_spec(0, &beyond, sprite()).unwrap();
        assert!(item.x > 933 && item.y > 700);
    }

    #[test]
    fn oversized_boxes_are_invalid() {
        let mapper = CoordinateMapper::identity();
        let huge = PlacementSpec::named("s", 0.0, 0.0, 4.0e9, 4.0e9);
        let skipped = mapper.map_spec(0, &huge, sprite()).unwrap_err();
        assert!(matches!(skipped.reason, SkipReason::InvalidPlacement(_)));

        let wide = PlacementSpec::named("s", 0.0, 0.0, 100_000.0, 200.0);
        assert!(mapper.map_spec(0, &wide, sprite()).is_err());

        let large = PlacementSpec::named("s", 0.0, 0.0, 4096.0, 4096.0);
        assert!(mapper.map_spec(0, &large, sprite()).is_ok());
    }

    #[test]
    fn collapsed_or_unreferenced_items_are_invalid() {
        let mapper = CoordinateMapper::new(
            DrawingSurface::new(1000.0, 1000.0),
            Dimensions::new(100, 100),
        );
        let tiny = PlacementSpec::named("rug.png", 0.0, 0.0, 5.0, 50.0);
        let skipped = mapper.map_spec(3, &tiny, sprite()).unwrap_err();
        assert_eq!(skipped.index, 3);
        assert!(matches!(skipped.reason, SkipReason::InvalidPlacement(_)));

        let unnamed = PlacementSpec {
            name: None,
            ..PlacementSpec::named("x", 0.0, 0.0, 500.0, 500.0)
        };
        assert!(mapper.map_spec(0, &unnamed, None).is_err());
    }

    #[test]
    fn remap_skips_restores_request_indices() {
        let mapped = MappedPlacements {
            items: Vec::new(),
            origins: vec![1, 4],
            skipped: Vec::new(),
        };
        let skipped = vec![SkippedItem {
            index: 1,
            label: "chair.png".into(),
            reason: SkipReason::MissingSourceAsset("/lib/chair.png".into()),
        }];
        assert_eq!(mapped.remap_skips(skipped)[0].index, 4);
    }
}
