use std::path::Path;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{
    DEFAULT_MAX_UPLOAD_BYTES, UPLOAD_DIMENSION_STEP, UPLOAD_MIN_DIMENSION, UPLOAD_START_DIMENSION,
};
use crate::error::Result;
use crate::io::image_io::decode_oriented;
use crate::io::CropRect;
use crate::lines::LineSegment;

const JPEG_START_QUALITY: u8 = 85;
const JPEG_MIN_QUALITY: u8 = 50;
const JPEG_QUALITY_STEP: u8 = 10;

/// How images are prepared for the verification service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Largest encoded image sent, in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    /// Send only the region around the candidate streak.
    #[serde(default)]
    pub crop_to_candidate: bool,
    /// Padding around the streak, as a fraction of its extent.
    #[serde(default = "default_crop_padding")]
    pub crop_padding: f32,
}

fn default_max_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}
fn default_crop_padding() -> f32 {
    0.25
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            crop_to_candidate: false,
            crop_padding: default_crop_padding(),
        }
    }
}

/// Encoded image ready to send.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadImage {
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

impl UploadImage {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// MIME type of a file the service takes as-is. `None` for formats it does
/// not accept (BMP, TIFF), which are re-encoded instead.
pub fn media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read `path` and shape it into something the service accepts.
///
/// Files within `max_bytes` in a format the service accepts go out untouched
/// unless cropping is requested.
/// Anything else is decoded, optionally cropped around `segment`, then
/// downscaled and JPEG-encoded with falling quality until it fits. If even
/// the smallest attempt is too large, it is sent anyway.
pub fn prepare_upload(
    path: &Path,
    segment: Option<&LineSegment>,
    analysis_scale: f32,
    settings: &UploadSettings,
) -> Result<UploadImage> {
    let crop_segment = segment.filter(|_| settings.crop_to_candidate);

    if let (None, Some(media_type)) = (crop_segment, media_type_for(path)) {
        let raw = std::fs::read(path)?;
        if raw.len() <= settings.max_bytes {
            return Ok(UploadImage {
                media_type,
                bytes: raw,
            });
        }
    }

    let mut img = decode_oriented(path)?;
    if let Some(seg) = crop_segment {
        let (w, h) = img.dimensions();
        let rect = CropRect::around_segment(seg, analysis_scale, settings.crop_padding, w, h)
            .validated(w, h)?;
        debug!(x = rect.x, y = rect.y, w = rect.width, h = rect.height, "Cropping upload");
        img = img.crop_imm(rect.x, rect.y, rect.width, rect.height);
    }

    let mut max_dim = UPLOAD_START_DIMENSION;
    loop {
        let resized = fit_within(&img, max_dim);
        let mut quality = JPEG_START_QUALITY;
        while quality >= JPEG_MIN_QUALITY {
            let bytes = encode_jpeg(&resized, quality)?;
            if bytes.len() <= settings.max_bytes {
                debug!(max_dim, quality, bytes = bytes.len(), "Re-encoded upload");
                return Ok(UploadImage {
                    media_type: "image/jpeg",
                    bytes,
                });
            }
            quality -= JPEG_QUALITY_STEP;
        }

        if max_dim < UPLOAD_MIN_DIMENSION + UPLOAD_DIMENSION_STEP {
            return Ok(UploadImage {
                media_type: "image/jpeg",
                bytes: encode_jpeg(&resized, JPEG_MIN_QUALITY)?,
            });
        }
        max_dim -= UPLOAD_DIMENSION_STEP;
    }
}

fn fit_within(img: &DynamicImage, max_dim: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w.max(h) > max_dim {
        img.resize(max_dim, max_dim, FilterType::Triangle)
    } else {
        img.clone()
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))?;
    Ok(bytes)
}
