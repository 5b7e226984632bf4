pub mod gradient;
pub mod nms;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{DEFAULT_EDGE_BLUR_SIGMA, DEFAULT_EDGE_THRESHOLD};
use crate::error::{MeteorError, Result};
use crate::filters::gaussian_blur::gaussian_blur_array;
use crate::raster::Raster;

pub use gradient::{sobel, Gradient};
pub use nms::suppress_non_maxima;

/// Configuration for edge extraction.
///
/// These values are independent of the meteor sensitivity level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Gaussian blur sigma applied before the Sobel pass.
    #[serde(default = "default_blur_sigma")]
    pub blur_sigma: f32,
    /// Minimum Sobel magnitude for an edge pixel.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

fn default_blur_sigma() -> f32 {
    DEFAULT_EDGE_BLUR_SIGMA
}
fn default_threshold() -> f32 {
    DEFAULT_EDGE_THRESHOLD
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            blur_sigma: DEFAULT_EDGE_BLUR_SIGMA,
            threshold: DEFAULT_EDGE_THRESHOLD,
        }
    }
}

/// Thinned binary edge mask plus the gradient magnitude it was cut from.
#[derive(Clone, Debug)]
pub struct EdgeMap {
    pub mask: Array2<bool>,
    pub magnitude: Array2<f32>,
}

impl EdgeMap {
    pub fn width(&self) -> usize {
        self.mask.ncols()
    }

    pub fn height(&self) -> usize {
        self.mask.nrows()
    }

    pub fn edge_count(&self) -> usize {
        self.mask.iter().filter(|&&e| e).count()
    }

    pub fn is_edge(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        self.mask
            .get([y as usize, x as usize])
            .copied()
            .unwrap_or(false)
    }

    /// Edge pixel coordinates as `(x, y)`, in row-major order.
    pub fn edge_points(&self) -> Vec<(usize, usize)> {
        self.mask
            .indexed_iter()
            .filter(|(_, &e)| e)
            .map(|((row, col), _)| (col, row))
            .collect()
    }
}

/// Smooth, differentiate, thin and threshold a raster into an [`EdgeMap`].
pub fn extract_edges(raster: &Raster, config: &EdgeConfig) -> Result<EdgeMap> {
    if raster.is_empty() {
        return Err(MeteorError::unsupported(
            "<raster>",
            format!(
                "cannot extract edges from a {}x{} raster",
                raster.width(),
                raster.height()
            ),
        ));
    }

    let smoothed = gaussian_blur_array(&raster.data, config.blur_sigma);
    let grad = sobel(&smoothed);
    let mask = suppress_non_maxima(&grad, config.threshold);

    let edges = EdgeMap {
        mask,
        magnitude: grad.magnitude,
    };
    debug!(
        width = edges.width(),
        height = edges.height(),
        edges = edges.edge_count(),
        "Extracted edges"
    );
    Ok(edges)
}
