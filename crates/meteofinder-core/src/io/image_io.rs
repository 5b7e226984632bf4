use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageReader};
use ndarray::Array2;
use tracing::debug;

use crate::consts::MAX_ANALYSIS_DIMENSION;
use crate::error::{MeteorError, Result};
use crate::raster::{ColorPlanes, Raster};

/// Supported image file extensions (lowercase, without the dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Returns true if the path has one of [`SUPPORTED_EXTENSIONS`] (case-insensitive).
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Decode an image file and apply its EXIF orientation.
pub fn decode_oriented(path: &Path) -> Result<DynamicImage> {
    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Load an image file into a [`Raster`] ready for analysis.
///
/// Any decode failure is reported as [`MeteorError::UnsupportedImage`] so the
/// caller can reject the single image and carry on.
pub fn load_raster(path: &Path) -> Result<Raster> {
    let img = decode_oriented(path).map_err(|e| MeteorError::unsupported(path, e.to_string()))?;
    raster_from_image(&img).map_err(|e| match e {
        MeteorError::UnsupportedImage { reason, .. } => MeteorError::unsupported(path, reason),
        other => other,
    })
}

/// Convert a decoded image into a [`Raster`], downsampling so the longest
/// side is at most [`MAX_ANALYSIS_DIMENSION`].
pub fn raster_from_image(img: &DynamicImage) -> Result<Raster> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(MeteorError::unsupported(
            "<memory>",
            format!("zero-sized image ({w}x{h})"),
        ));
    }

    let color_type = img.color();
    let channel_bits = color_type.bytes_per_pixel() as u32 * 8 / color_type.channel_count() as u32;
    let bit_depth = channel_bits.min(u8::MAX as u32) as u8;

    let longest = w.max(h);
    let (img, scale) = if longest > MAX_ANALYSIS_DIMENSION {
        let scale = MAX_ANALYSIS_DIMENSION as f32 / longest as f32;
        let nw = ((w as f32 * scale).round() as u32).max(1);
        let nh = ((h as f32 * scale).round() as u32).max(1);
        debug!(from_w = w, from_h = h, to_w = nw, to_h = nh, "Downsampling for analysis");
        (img.resize_exact(nw, nh, FilterType::Triangle), scale)
    } else {
        (img.clone(), 1.0)
    };

    let raster = if color_type.has_color() {
        Raster::from_color(color_planes(&img), bit_depth)
    } else {
        Raster::new(gray_plane(&img), bit_depth)
    };

    Ok(raster.with_scale(scale))
}

fn gray_plane(img: &DynamicImage) -> Array2<f32> {
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    let mut data = Array2::<f32>::zeros((h as usize, w as usize));

    for (col, row, pixel) in gray.enumerate_pixels() {
        data[[row as usize, col as usize]] = pixel.0[0] as f32 / 65535.0;
    }

    data
}

fn color_planes(img: &DynamicImage) -> ColorPlanes {
    let rgb = img.to_rgb16();
    let (w, h) = rgb.dimensions();
    let mut red = Array2::<f32>::zeros((h as usize, w as usize));
    let mut green = Array2::<f32>::zeros((h as usize, w as usize));
    let mut blue = Array2::<f32>::zeros((h as usize, w as usize));

    for (col, row, pixel) in rgb.enumerate_pixels() {
        let (r, c) = (row as usize, col as usize);
        red[[r, c]] = pixel.0[0] as f32 / 65535.0;
        green[[r, c]] = pixel.0[1] as f32 / 65535.0;
        blue[[r, c]] = pixel.0[2] as f32 / 65535.0;
    }

    ColorPlanes { red, green, blue }
}
