use ndarray::Array2;

use crate::consts::{LUMINANCE_B, LUMINANCE_G, LUMINANCE_R};

/// A single night-sky image prepared for analysis.
/// Pixel values are f32 in [0.0, 1.0].
#[derive(Clone, Debug)]
pub struct Raster {
    /// Grayscale intensity, row-major, shape = (height, width)
    pub data: Array2<f32>,
    /// Colour planes at the same resolution, when the source had colour.
    pub color: Option<ColorPlanes>,
    /// Original bit depth before conversion (8 or 16)
    pub original_bit_depth: u8,
    /// Analysis size divided by original size (1.0 when not downsampled).
    pub scale: f32,
}

impl Raster {
    pub fn new(data: Array2<f32>, bit_depth: u8) -> Self {
        Self {
            data,
            color: None,
            original_bit_depth: bit_depth,
            scale: 1.0,
        }
    }

    /// Build a raster from colour planes; the grayscale plane is their luminance.
    pub fn from_color(color: ColorPlanes, bit_depth: u8) -> Self {
        let data = color.luminance();
        Self {
            data,
            color: Some(color),
            original_bit_depth: bit_depth,
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Bilinear sample at sub-pixel position `(x, y)`; `None` outside the image.
    pub fn sample(&self, x: f32, y: f32) -> Option<f32> {
        bilinear(&self.data, x, y)
    }

    /// Nearest-pixel RGB at `(x, y)`, when colour planes are present.
    pub fn rgb_at(&self, x: f32, y: f32) -> Option<[f32; 3]> {
        let color = self.color.as_ref()?;
        let col = x.round();
        let row = y.round();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if row >= self.height() || col >= self.width() {
            return None;
        }
        Some([
            color.red[[row, col]],
            color.green[[row, col]],
            color.blue[[row, col]],
        ])
    }
}

/// Colour image held as separate channel planes.
#[derive(Clone, Debug)]
pub struct ColorPlanes {
    pub red: Array2<f32>,
    pub green: Array2<f32>,
    pub blue: Array2<f32>,
}

impl ColorPlanes {
    pub fn luminance(&self) -> Array2<f32> {
        let mut out = self.red.mapv(|r| r * LUMINANCE_R);
        out.zip_mut_with(&self.green, |o, &g| *o += g * LUMINANCE_G);
        out.zip_mut_with(&self.blue, |o, &b| *o += b * LUMINANCE_B);
        out
    }
}

pub(crate) fn bilinear(data: &Array2<f32>, x: f32, y: f32) -> Option<f32> {
    let (h, w) = data.dim();
    if w == 0 || h == 0 || x < 0.0 || y < 0.0 {
        return None;
    }
    let max_x = (w - 1) as f32;
    let max_y = (h - 1) as f32;
    if x > max_x || y > max_y {
        return None;
    }

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let top = data[[y0, x0]] * (1.0 - fx) + data[[y0, x1]] * fx;
    let bottom = data[[y1, x0]] * (1.0 - fx) + data[[y1, x1]] * fx;
    Some(top * (1.0 - fy) + bottom * fy)
}
