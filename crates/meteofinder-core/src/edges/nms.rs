use ndarray::Array2;

use super::gradient::Gradient;

const TAN_22_5_DEG: f32 = 0.414_213_56;

/// Canny-style thinning: keep a pixel only if its magnitude reaches `threshold`
/// and is not smaller than both neighbours along the quantized gradient direction.
///
/// Ties are kept so that a flat-topped response does not vanish entirely.
pub fn suppress_non_maxima(grad: &Gradient, threshold: f32) -> Array2<bool> {
    let (h, w) = grad.magnitude.dim();
    let mut mask = Array2::from_elem((h, w), false);
    if h < 3 || w < 3 {
        return mask;
    }

    let mag = &grad.magnitude;
    for row in 1..h - 1 {
        for col in 1..w - 1 {
            let m = mag[[row, col]];
            if m < threshold {
                continue;
            }

            let gx = grad.gx[[row, col]];
            let gy = grad.gy[[row, col]];
            let ax = gx.abs();
            let ay = gy.abs();

            // Rows grow downwards, so a gradient with gx and gy of the same sign
            // points along the main diagonal (down-right).
            let (a, b) = if ay <= ax * TAN_22_5_DEG {
                (mag[[row, col - 1]], mag[[row, col + 1]])
            } else if ax <= ay * TAN_22_5_DEG {
                (mag[[row - 1, col]], mag[[row + 1, col]])
            } else if (gx > 0.0) == (gy > 0.0) {
                (mag[[row - 1, col - 1]], mag[[row + 1, col + 1]])
            } else {
                (mag[[row - 1, col + 1]], mag[[row + 1, col - 1]])
            };

            if m >= a && m >= b {
                mask[[row, col]] = true;
            }
        }
    }

    mask
}
