use ndarray::Array2;

/// Sobel gradient components and magnitude.
#[derive(Clone, Debug)]
pub struct Gradient {
    pub gx: Array2<f32>,
    pub gy: Array2<f32>,
    pub magnitude: Array2<f32>,
}

/// Compute the Sobel gradient of an image.
///
/// Sobel kernels:
///   Gx = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]]
///   Gy = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]]
///
/// The 1-pixel border is zero (Sobel kernel needs a 3x3 neighborhood).
pub fn sobel(data: &Array2<f32>) -> Gradient {
    let (h, w) = data.dim();
    let mut gx = Array2::<f32>::zeros((h, w));
    let mut gy = Array2::<f32>::zeros((h, w));
    let mut magnitude = Array2::<f32>::zeros((h, w));

    if h < 3 || w < 3 {
        return Gradient { gx, gy, magnitude };
    }

    for row in 1..h - 1 {
        for col in 1..w - 1 {
            let x = -data[[row - 1, col - 1]] + data[[row - 1, col + 1]]
                - 2.0 * data[[row, col - 1]]
                + 2.0 * data[[row, col + 1]]
                - data[[row + 1, col - 1]]
                + data[[row + 1, col + 1]];

            let y = -data[[row - 1, col - 1]]
                - 2.0 * data[[row - 1, col]]
                - data[[row - 1, col + 1]]
                + data[[row + 1, col - 1]]
                + 2.0 * data[[row + 1, col]]
                + data[[row + 1, col + 1]];

            gx[[row, col]] = x;
            gy[[row, col]] = y;
            magnitude[[row, col]] = (x * x + y * y).sqrt();
        }
    }

    Gradient { gx, gy, magnitude }
}
