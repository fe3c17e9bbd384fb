use std::borrow::Cow;
use std::fs;
use std::io::Cursor;

use core_types::{Dimensions, ImageSource};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::{EngineError, Result};

/// Read the raw bytes behind a source. A path that does not exist is a
/// `MissingSourceAsset`, distinct from any decode failure.
pub fn read_source(source: &ImageSource) -> Result<Cow<'_, [u8]>> {
    match source {
        ImageSource::Path(path) => {
            if !path.is_file() {
                return Err(EngineError::MissingSourceAsset { path: path.clone() });
            }
            Ok(Cow::Owned(fs::read(path)?))
        }
        ImageSource::Bytes { data, .. } => Ok(Cow::Borrowed(&data[..])),
    }
}

pub fn decode(source: &ImageSource) -> Result<DynamicImage> {
    let bytes = read_source(source)?;
    let format = guess_format(source, &bytes)?;
    image::load_from_memory_with_format(&bytes, format).map_err(|err| {
        EngineError::UnsupportedImageFormat {
            source_name: source.label(),
            reason: err.to_string(),
        }
    })
}

/// Header-only dimension probe.
pub fn probe_dimensions(source: &ImageSource) -> Result<Dimensions> {
    let bytes = read_source(source)?;
    let format = guess_format(source, &bytes)?;
    let (width, height) = ImageReader::with_format(Cursor::new(&bytes[..]), format)
        .into_dimensions()
        .map_err(|err| EngineError::UnsupportedImageFormat {
            source_name: source.label(),
            reason: err.to_string(),
        })?;
    Ok(Dimensions::new(width, height))
}

fn guess_format(source: &ImageSource, bytes: &[u8]) -> Result<ImageFormat> {
    image::guess_format(bytes).map_err(|_| EngineError::UnsupportedImageFormat {
        source_name: source.label(),
        reason: "not a recognised image file".to_string(),
    })
}

/// Lossy encode as 8-bit RGB; alpha is dropped, so callers flatten first.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder
        .encode_image(&rgb)
        .map_err(|err| EngineError::Encode(format!("JPEG encode failed: {err}")))?;
    Ok(bytes)
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| EngineError::Encode(format!("PNG encode failed: {err}")))?;
    Ok(bytes)
}
