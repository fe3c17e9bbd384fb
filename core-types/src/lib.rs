use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub mod file_kind;

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Where the bytes of an input image come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes { label: String, data: Arc<[u8]> },
}

impl ImageSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn bytes(label: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes {
            label: label.into(),
            data: data.into(),
        }
    }

    /// Human-readable name used in diagnostics.
    pub fn label(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes { label, .. } => label.clone(),
        }
    }
}

/// The client-side coordinate space placements were authored in.
///
/// A zero (or negative) extent means the client did not report its size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawingSurface {
    pub width: f64,
    pub height: f64,
}

impl DrawingSurface {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_known(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

fn default_extent() -> f64 {
    100.0
}

/// One furniture placement exactly as the client submitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementSpec {
    /// File name inside the furniture library.
    #[serde(default)]
    pub name: Option<String>,
    /// Explicit sprite location; takes precedence over `name`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "default_extent")]
    pub width: f64,
    #[serde(default = "default_extent")]
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
}

impl PlacementSpec {
    pub fn named(name: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            name: Some(name.into()),
            path: None,
            x,
            y,
            width,
            height,
            rotation: 0.0,
        }
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn label(&self) -> String {
        if let Some(path) = &self.path {
            return path.display().to_string();
        }
        self.name.clone().unwrap_or_else(|| "<unnamed>".to_string())
    }
}

/// A full compose request: the background, the placements and the surface size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementRequest {
    #[serde(default)]
    pub living_room_image: Option<String>,
    #[serde(default)]
    pub furniture_items: Vec<PlacementSpec>,
    #[serde(default)]
    pub canvas_bg_width: f64,
    #[serde(default)]
    pub canvas_bg_height: f64,
}

impl PlacementRequest {
    pub fn surface(&self) -> DrawingSurface {
        DrawingSurface::new(self.canvas_bg_width, self.canvas_bg_height)
    }
}

/// A placement resolved into normalized background pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementItem {
    pub sprite: ImageSource,
    pub label: String,
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
    /// Degrees as authored by the client (clockwise-positive).
    pub rotation: f64,
}
