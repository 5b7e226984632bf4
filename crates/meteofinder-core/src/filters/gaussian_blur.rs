use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Apply Gaussian blur to a raw array using separable 1D convolution.
///
/// Borders are handled by clamping. A non-positive `sigma` returns a copy.
pub fn gaussian_blur_array(data: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 {
        return data.clone();
    }
    let kernel = make_gaussian_kernel(sigma);
    let row_pass = convolve(data, &kernel, Axis::Rows);
    convolve(&row_pass, &kernel, Axis::Cols)
}

fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    let size = 2 * radius + 1;
    let mut kernel = vec![0.0f32; size];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;

    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        *k = (-x * x / s2).exp();
        sum += *k;
    }

    for v in &mut kernel {
        *v /= sum;
    }

    kernel
}

#[derive(Clone, Copy)]
enum Axis {
    Rows,
    Cols,
}

fn convolve(data: &Array2<f32>, kernel: &[f32], axis: Axis) -> Array2<f32> {
    let (h, w) = data.dim();
    let radius = kernel.len() as isize / 2;

    let tap = |row: usize, col: usize| -> f32 {
        let mut sum = 0.0f32;
        for (ki, &kv) in kernel.iter().enumerate() {
            let offset = ki as isize - radius;
            let v = match axis {
                Axis::Rows => {
                    let c = (col as isize + offset).clamp(0, w as isize - 1) as usize;
                    data[[row, c]]
                }
                Axis::Cols => {
                    let r = (row as isize + offset).clamp(0, h as isize - 1) as usize;
                    data[[r, col]]
                }
            };
            sum += v * kv;
        }
        sum
    };

    let mut result = Array2::<f32>::zeros((h, w));
    if h == 0 || w == 0 {
        return result;
    }

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<f32>> = (0..h)
            .into_par_iter()
            .map(|row| (0..w).map(|col| tap(row, col)).collect())
            .collect();

        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
    } else {
        for row in 0..h {
            for col in 0..w {
                result[[row, col]] = tap(row, col);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_normalized() {
        let k = make_gaussian_kernel(1.0);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(k.len(), 7);
    }

    #[test]
    fn test_blur_preserves_constant() {
        let data = Array2::from_elem((10, 12), 0.4f32);
        let out = gaussian_blur_array(&data, 1.5);
        for v in out.iter() {
            assert!((v - 0.4).abs() < 1e-5);
        }
    }
}
