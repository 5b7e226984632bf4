use crate::error::{MeteorError, Result};
use crate::lines::LineSegment;

/// A rectangle in image coordinates for cropping.
#[derive(Clone, Debug, PartialEq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Validate the crop rect against source dimensions.
    pub fn validated(&self, src_w: u32, src_h: u32) -> Result<CropRect> {
        if self.width == 0 || self.height == 0 {
            return Err(MeteorError::Configuration(
                "Crop width and height must be > 0".into(),
            ));
        }

        if self.x + self.width > src_w || self.y + self.height > src_h {
            return Err(MeteorError::Configuration(format!(
                "Crop region ({},{} {}x{}) exceeds source dimensions ({src_w}x{src_h})",
                self.x, self.y, self.width, self.height
            )));
        }

        Ok(self.clone())
    }

    /// Bounding box of a segment found on a raster analysed at `scale`,
    /// mapped back to source pixels and padded by `padding_fraction` of the
    /// segment's extent on every side. Clamped to the source dimensions.
    pub fn around_segment(
        segment: &LineSegment,
        scale: f32,
        padding_fraction: f32,
        src_w: u32,
        src_h: u32,
    ) -> CropRect {
        let inv = if scale > 0.0 { 1.0 / scale } else { 1.0 };
        let min_x = segment.x1.min(segment.x2) * inv;
        let max_x = segment.x1.max(segment.x2) * inv;
        let min_y = segment.y1.min(segment.y2) * inv;
        let max_y = segment.y1.max(segment.y2) * inv;

        let extent = (max_x - min_x).max(max_y - min_y).max(1.0);
        let pad = extent * padding_fraction.max(0.0);

        let x0 = (min_x - pad).floor().max(0.0) as u32;
        let y0 = (min_y - pad).floor().max(0.0) as u32;
        let x1 = ((max_x + pad).ceil() as u32).min(src_w);
        let y1 = ((max_y + pad).ceil() as u32).min(src_h);

        CropRect {
            x: x0.min(src_w.saturating_sub(1)),
            y: y0.min(src_h.saturating_sub(1)),
            width: x1.saturating_sub(x0).max(1),
            height: y1.saturating_sub(y0).max(1),
        }
    }
}
