use std::path::{Path, PathBuf};

use core_types::{Dimensions, ImageSource, PlacementRequest, PlacementSpec};

use crate::coords::{CoordinateMapper, MappedPlacements};
use crate::events::EngineEvent;
use crate::normalize::ResizeDecision;
use crate::report::SkippedItem;
use crate::stroke::{self, StrokeBlend};
use crate::{codec, CompositeEngine, Result};

/// Turns a client placement into the sprite it refers to.
pub trait AssetResolver: Send + Sync {
    /// `None` when the placement names no sprite at all. A reference to a
    /// file that does not exist still resolves; the compositor reports it as
    /// missing.
    fn resolve(&self, spec: &PlacementSpec) -> Option<ImageSource>;
}

/// Resolves `name` inside a furniture library directory. An explicit `path`
/// on the placement wins.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetResolver for DirectoryResolver {
    fn resolve(&self, spec: &PlacementSpec) -> Option<ImageSource> {
        if let Some(path) = &spec.path {
            return Some(ImageSource::Path(path.clone()));
        }
        let name = spec.name.as_deref()?.trim();
        // Final path component only; names never leave the library root.
        let file_name = Path::new(name).file_name()?;
        Some(ImageSource::Path(self.root.join(file_name)))
    }
}

/// One encoded output plus the placements it had to leave out.
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    pub bytes: Vec<u8>,
    pub dimensions: Dimensions,
    /// Indices refer to the request's `furniture_items`.
    pub skipped: Vec<SkippedItem>,
}

/// Result of [`CompositeEngine::generate_pair`]. The composite and the mask
/// are produced independently, so one can fail while the other succeeds.
#[derive(Debug)]
pub struct PairOutcome {
    pub decision: ResizeDecision,
    pub mapping: CoordinateMapper,
    /// Items rejected before rendering (no sprite reference, bad geometry).
    pub placement_skips: Vec<SkippedItem>,
    pub composite: Result<EncodedArtifact>,
    pub mask: Result<EncodedArtifact>,
}

impl PairOutcome {
    pub fn is_success(&self) -> bool {
        self.composite.is_ok() && self.mask.is_ok()
    }

    /// Every diagnostic for the request, sorted by item index and deduplicated.
    pub fn all_skips(&self) -> Vec<SkippedItem> {
        let mut all = self.placement_skips.clone();
        for artifact in [&self.composite, &self.mask].into_iter().flatten() {
            all.extend(artifact.skipped.iter().cloned());
        }
        all.sort_by_key(|item| item.index);
        all.dedup();
        all
    }
}

impl CompositeEngine {
    /// Map every placement in `request` into normalized pixel space.
    pub fn map_placements(
        &self,
        request: &PlacementRequest,
        mapper: &CoordinateMapper,
        resolver: &dyn AssetResolver,
    ) -> MappedPlacements {
        let mut mapped = MappedPlacements::default();

        for (index, spec) in request.furniture_items.iter().enumerate() {
            match mapper.map_spec(index, spec, resolver.resolve(spec)) {
                Ok(item) => {
                    self.callbacks().emit(EngineEvent::PlacementMapped {
                        index,
                        label: item.label.clone(),
                        authored: [spec.x, spec.y, spec.width, spec.height],
                        mapped: [item.x, item.y, item.width as i64, item.height as i64],
                    });
                    mapped.items.push(item);
                    mapped.origins.push(index);
                }
                Err(skipped) => {
                    self.callbacks().emit(EngineEvent::ItemSkipped(skipped.clone()));
                    mapped.skipped.push(skipped);
                }
            }
        }

        mapped
    }

    /// Normalize the background, map the request and render both the preview
    /// composite and the mask from the same placements.
    ///
    /// Only background problems fail the call. Rendering failures are
    /// reported per artifact in the outcome.
    pub fn generate_pair(
        &self,
        background: &ImageSource,
        request: &PlacementRequest,
        resolver: &dyn AssetResolver,
    ) -> Result<PairOutcome> {
        let normalized = self.load_background(background)?;
        let canvas = normalized.dimensions();
        let mapping = self.mapper_for(request, canvas);
        let mapped = self.map_placements(request, &mapping, resolver);
        let quality = self.options().jpeg_quality;

        let composite = self.composite(&normalized, &mapped.items).and_then(|out| {
            Ok(EncodedArtifact {
                bytes: out.encode_jpeg(quality)?,
                dimensions: out.dimensions(),
                skipped: mapped.remap_skips(out.skipped),
            })
        });
        let mask = self.mask(canvas, &mapped.items).and_then(|out| {
            Ok(EncodedArtifact {
                bytes: out.encode_jpeg(quality)?,
                dimensions: out.dimensions(),
                skipped: mapped.remap_skips(out.skipped),
            })
        });

        Ok(PairOutcome {
            decision: normalized.decision,
            mapping,
            placement_skips: mapped.skipped,
            composite,
            mask,
        })
    }

    /// Paint a freehand stroke layer over a background photo.
    pub fn blend_stroke(&self, background: &ImageSource, stroke: &ImageSource) -> Result<StrokeBlend> {
        let background = if self.options().normalize_stroke_background {
            self.load_background(background)?.image
        } else {
            codec::decode(background)?
        };
        let stroke = codec::decode(stroke)?;
        stroke::blend_stroke(
            &background,
            &stroke,
            self.options().stroke_dimensions,
            self.callbacks(),
        )
    }
}
