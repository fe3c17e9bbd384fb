use std::fmt;
use std::sync::Arc;

use core_types::Dimensions;
use tracing::{debug, warn};

use crate::normalize::ResizeDecision;
use crate::report::SkippedItem;
use crate::stroke::StrokeStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Composite,
    Mask,
    AnnotatedScene,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Composite => "composite",
            ArtifactKind::Mask => "mask",
            ArtifactKind::AnnotatedScene => "annotated scene",
        }
    }
}

/// Observable facts produced while the engine works.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    BackgroundNormalized(ResizeDecision),
    SurfaceMapped {
        scale_x: f64,
        scale_y: f64,
        identity_fallback: bool,
    },
    PlacementMapped {
        index: usize,
        label: String,
        /// x, y, width, height as authored on the drawing surface.
        authored: [f64; 4],
        /// x, y, width, height in normalized background pixels.
        mapped: [i64; 4],
    },
    ItemSkipped(SkippedItem),
    StrokeResized {
        from: Dimensions,
        to: Dimensions,
    },
    StrokeBlended(StrokeStats),
    ArtifactRendered {
        kind: ArtifactKind,
        dimensions: Dimensions,
        skipped: usize,
    },
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::BackgroundNormalized(decision) if decision.upscaled() => write!(
                f,
                "background resized {} -> {} (x{:.2})",
                decision.original,
                decision.normalized,
                decision.factor()
            ),
            EngineEvent::BackgroundNormalized(decision) => {
                write!(f, "background kept at {}", decision.original)
            }
            EngineEvent::SurfaceMapped {
                scale_x,
                scale_y,
                identity_fallback,
            } => {
                if *identity_fallback {
                    write!(f, "drawing surface size unknown, using scale 1.0")
                } else {
                    write!(f, "coordinate scale x={scale_x:.3} y={scale_y:.3}")
                }
            }
            EngineEvent::PlacementMapped {
                index,
                label,
                authored,
                mapped,
            } => write!(
                f,
                "item #{index} {label}: ({},{},{},{}) -> ({},{},{},{})",
                authored[0],
                authored[1],
                authored[2],
                authored[3],
                mapped[0],
                mapped[1],
                mapped[2],
                mapped[3]
            ),
            EngineEvent::ItemSkipped(item) => write!(f, "skipped {item}"),
            EngineEvent::StrokeResized { from, to } => {
                write!(f, "stroke layer resized {from} -> {to}")
            }
            EngineEvent::StrokeBlended(stats) => write!(
                f,
                "stroke blended: {} of {} pixels painted, mean alpha {:.1}, transparency {}%",
                stats.painted_pixels,
                stats.total_pixels,
                stats.mean_alpha,
                stats.transparency_percent
            ),
            EngineEvent::ArtifactRendered {
                kind,
                dimensions,
                skipped,
            } => write!(
                f,
                "{} rendered at {dimensions} ({skipped} item(s) skipped)",
                kind.as_str()
            ),
        }
    }
}

/// Caller-supplied sink for [`EngineEvent`]s.
#[derive(Clone, Default)]
pub struct EngineCallbacks {
    pub on_event: Option<Arc<dyn Fn(&EngineEvent) + Send + Sync>>,
}

impl EngineCallbacks {
    pub fn new(on_event: impl Fn(&EngineEvent) + Send + Sync + 'static) -> Self {
        Self {
            on_event: Some(Arc::new(on_event)),
        }
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        match &event {
            EngineEvent::ItemSkipped(_) | EngineEvent::StrokeResized { .. } => warn!("{event}"),
            EngineEvent::SurfaceMapped {
                identity_fallback: true,
                ..
            } => warn!("{event}"),
            _ => debug!("{event}"),
        }

        if let Some(cb) = &self.on_event {
            cb(&event);
        }
    }
}

impl fmt::Debug for EngineCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineCallbacks")
            .field("on_event", &self.on_event.is_some())
            .finish()
    }
}
