use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::{
    HOUGH_PEAK_RHO_RADIUS, HOUGH_PEAK_THETA_RADIUS, HOUGH_THETA_BINS, PARALLEL_PIXEL_THRESHOLD,
};
use crate::edges::EdgeMap;

/// A (theta, rho) vote accumulator over an edge map.
///
/// Theta is the angle of the line normal, one bin per degree over [0, 180).
/// Rho bins are 1 px wide and offset by `rho_offset` so that index 0 holds
/// the most negative distance.
pub struct HoughAccumulator {
    pub votes: Array2<u32>,
    pub rho_offset: usize,
    cos_table: Vec<f32>,
    sin_table: Vec<f32>,
}

/// A local maximum of the accumulator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoughPeak {
    pub theta_bin: usize,
    pub rho: f32,
    pub votes: u32,
}

impl HoughPeak {
    /// Normal angle in radians.
    pub fn theta(&self) -> f32 {
        self.theta_bin as f32 * std::f32::consts::PI / HOUGH_THETA_BINS as f32
    }
}

impl HoughAccumulator {
    pub fn theta_bins(&self) -> usize {
        self.votes.nrows()
    }

    pub fn rho_bins(&self) -> usize {
        self.votes.ncols()
    }

    pub fn cos_sin(&self, theta_bin: usize) -> (f32, f32) {
        (self.cos_table[theta_bin], self.sin_table[theta_bin])
    }

    /// Vote every edge pixel into every theta bin.
    pub fn accumulate(edges: &EdgeMap) -> Self {
        let (h, w) = (edges.height(), edges.width());
        let diag = ((w * w + h * h) as f32).sqrt().ceil() as usize;
        let rho_bins = 2 * diag + 1;
        let step = std::f32::consts::PI / HOUGH_THETA_BINS as f32;
        let cos_table: Vec<f32> = (0..HOUGH_THETA_BINS)
            .map(|t| (t as f32 * step).cos())
            .collect();
        let sin_table: Vec<f32> = (0..HOUGH_THETA_BINS)
            .map(|t| (t as f32 * step).sin())
            .collect();

        let points = edges.edge_points();
        let column = |t: usize| -> Vec<u32> {
            let mut col = vec![0u32; rho_bins];
            let (c, s) = (cos_table[t], sin_table[t]);
            for &(x, y) in &points {
                let rho = x as f32 * c + y as f32 * s;
                let idx = (rho.round() as i64 + diag as i64) as usize;
                if idx < rho_bins {
                    col[idx] += 1;
                }
            }
            col
        };

        let columns: Vec<Vec<u32>> = if w * h >= PARALLEL_PIXEL_THRESHOLD {
            (0..HOUGH_THETA_BINS).into_par_iter().map(column).collect()
        } else {
            (0..HOUGH_THETA_BINS).map(column).collect()
        };

        let mut votes = Array2::<u32>::zeros((HOUGH_THETA_BINS, rho_bins));
        for (t, col) in columns.into_iter().enumerate() {
            for (r, v) in col.into_iter().enumerate() {
                votes[[t, r]] = v;
            }
        }

        Self {
            votes,
            rho_offset: diag,
            cos_table,
            sin_table,
        }
    }

    /// Cells with at least `min_votes` that are maxima of their suppression
    /// window, strongest first, at most `max_peaks` of them.
    ///
    /// The window wraps across theta = 0/180, where rho changes sign. Among
    /// equal-valued neighbours the one with the lower flat index survives.
    pub fn peaks(&self, min_votes: u32, max_peaks: usize) -> Vec<HoughPeak> {
        let bins = self.theta_bins() as i64;
        let rho_bins = self.rho_bins() as i64;
        let mut peaks = Vec::new();

        for ((t, r), &v) in self.votes.indexed_iter() {
            if v < min_votes || v == 0 {
                continue;
            }
            let here = t as i64 * rho_bins + r as i64;
            let mut is_peak = true;

            'window: for dt in -(HOUGH_PEAK_THETA_RADIUS as i64)..=HOUGH_PEAK_THETA_RADIUS as i64 {
                let mut nt = t as i64 + dt;
                let mut mirrored = false;
                if nt < 0 {
                    nt += bins;
                    mirrored = true;
                } else if nt >= bins {
                    nt -= bins;
                    mirrored = true;
                }
                for dr in -(HOUGH_PEAK_RHO_RADIUS as i64)..=HOUGH_PEAK_RHO_RADIUS as i64 {
                    if dt == 0 && dr == 0 {
                        continue;
                    }
                    let mut nr = r as i64 + dr;
                    if mirrored {
                        nr = rho_bins - 1 - nr;
                    }
                    if nr < 0 || nr >= rho_bins {
                        continue;
                    }
                    let other = self.votes[[nt as usize, nr as usize]];
                    let there = nt * rho_bins + nr;
                    if other > v || (other == v && there < here) {
                        is_peak = false;
                        break 'window;
                    }
                }
            }

            if is_peak {
                peaks.push(HoughPeak {
                    theta_bin: t,
                    rho: r as f32 - self.rho_offset as f32,
                    votes: v,
                });
            }
        }

        peaks.sort_by(|a, b| {
            b.votes
                .cmp(&a.votes)
                .then(a.theta_bin.cmp(&b.theta_bin))
                .then(a.rho.total_cmp(&b.rho))
        });
        peaks.truncate(max_peaks);
        peaks
    }
}
