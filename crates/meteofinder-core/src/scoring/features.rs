use serde::{Deserialize, Serialize};

use crate::consts::{BACKGROUND_OFFSET, RIDGE_HALF_WIDTH};
use crate::lines::LineSegment;
use crate::raster::Raster;

/// Ridge samples fainter than this above the background carry no centroid.
const RIDGE_PRESENCE: f32 = 0.04;

/// Percentile of the ridge profile taken as the "lit" level.
const LIT_PERCENTILE: f32 = 0.8;

/// Dark samples needed in a row to split the ridge into separate runs.
const MIN_DARK_GAP: usize = 2;

/// Red-light colour test: minimum red value and dominance over green and blue.
const RED_MIN: f32 = 0.55;
const RED_DOMINANCE: f32 = 1.5;

/// Measurements of one segment against the raster it was found in.
///
/// None of these depend on the sensitivity level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentFeatures {
    /// Segment length in analysis pixels.
    pub length: f32,
    /// Mean intensity along the fitted ridge line.
    pub brightness: f32,
    /// Median intensity either side of the segment.
    pub background: f32,
    pub contrast: f32,
    /// RMS deviation (px) of the ridge centroids from their straight fit.
    pub curvature: f32,
    /// Separate lit runs along the ridge.
    pub modulation_runs: usize,
    /// Fraction of ridge samples that are dark, between the first and last lit one.
    pub dropout: f32,
    /// Ridge samples that look like a red navigation light.
    pub red_hits: usize,
}

impl SegmentFeatures {
    /// Periodic on/off profile typical of blinking aircraft lights.
    pub fn is_dotted(&self, min_dropout: f32, min_runs: usize) -> bool {
        self.dropout >= min_dropout && self.modulation_runs >= min_runs
    }
}

/// Sample the raster along `segment` and compute its [`SegmentFeatures`].
///
/// Samples are taken every pixel along the segment. Each sample looks up to
/// [`RIDGE_HALF_WIDTH`] pixels across the line for the bright ridge, because
/// edge-derived segments sit on the flank of a streak rather than its centre.
pub fn measure_segment(raster: &Raster, segment: &LineSegment) -> SegmentFeatures {
    let (dx, dy) = segment.direction();
    let (nx, ny) = segment.normal();
    let steps = segment.length.floor().max(0.0) as usize;
    let point = |t: f32, across: f32| -> (f32, f32) {
        (
            segment.x1 + t * dx + across * nx,
            segment.y1 + t * dy + across * ny,
        )
    };
    let sample = |t: f32, across: f32| -> Option<f32> {
        let (x, y) = point(t, across);
        raster.sample(x, y)
    };

    let mut bg_samples = Vec::with_capacity(2 * (steps + 1));
    for i in 0..=steps {
        let t = i as f32;
        for side in [-BACKGROUND_OFFSET, BACKGROUND_OFFSET] {
            if let Some(v) = sample(t, side) {
                bg_samples.push(v);
            }
        }
    }

    // Ridge centroids across the line, from the upper half of each profile.
    let mut centroids: Vec<(f32, f32)> = Vec::with_capacity(steps + 1);
    let background = median(&mut bg_samples);
    if let Some(bg) = background {
        for i in 0..=steps {
            let t = i as f32;
            let profile: Vec<(f32, f32)> = (-RIDGE_HALF_WIDTH..=RIDGE_HALF_WIDTH)
                .filter_map(|k| sample(t, k as f32).map(|v| (k as f32, v)))
                .collect();
            let Some(peak) = profile.iter().map(|&(_, v)| v).reduce(f32::max) else {
                continue;
            };
            if peak - bg < RIDGE_PRESENCE {
                continue;
            }
            let half = (bg + peak) * 0.5;
            let (mut sum_w, mut sum_kw) = (0.0f32, 0.0f32);
            for &(k, v) in &profile {
                let w = (v - half).max(0.0);
                sum_w += w;
                sum_kw += k * w;
            }
            if sum_w > 0.0 {
                centroids.push((t, sum_kw / sum_w));
            }
        }
    }

    let (fit, curvature) = match fit_line(&centroids) {
        Some((a, b, rms)) => ((a, b), rms),
        None => ((0.0, 0.0), RIDGE_HALF_WIDTH as f32),
    };

    let mut ridge = Vec::with_capacity(steps + 1);
    let mut red_hits = 0;
    for i in 0..=steps {
        let t = i as f32;
        let across = fit.0 + fit.1 * t;
        let (x, y) = point(t, across);
        if let Some(v) = raster.sample(x, y) {
            ridge.push(v);
        }
        if let Some([r, g, b]) = raster.rgb_at(x, y) {
            if r >= RED_MIN && r > RED_DOMINANCE * g && r > RED_DOMINANCE * b {
                red_hits += 1;
            }
        }
    }

    let brightness = if ridge.is_empty() {
        0.0
    } else {
        ridge.iter().sum::<f32>() / ridge.len() as f32
    };
    let background = background.unwrap_or(brightness);
    let (modulation_runs, dropout) = modulation(&ridge, background);

    SegmentFeatures {
        length: segment.length,
        brightness,
        background,
        contrast: brightness - background,
        curvature,
        modulation_runs,
        dropout,
        red_hits,
    }
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    Some(values[values.len() / 2])
}

fn percentile(values: &[f32], q: f32) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let idx = ((sorted.len() - 1) as f32 * q).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Least-squares line `offset = a + b * t` through the centroids and the RMS
/// residual about it. Needs at least three points.
fn fit_line(points: &[(f32, f32)]) -> Option<(f32, f32, f32)> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len() as f64;
    let mean_t = points.iter().map(|p| p.0 as f64).sum::<f64>() / n;
    let mean_c = points.iter().map(|p| p.1 as f64).sum::<f64>() / n;
    let mut stt = 0.0f64;
    let mut stc = 0.0f64;
    for &(t, c) in points {
        let dt = t as f64 - mean_t;
        stt += dt * dt;
        stc += dt * (c as f64 - mean_c);
    }
    let b = if stt > 0.0 { stc / stt } else { 0.0 };
    let a = mean_c - b * mean_t;
    let sse: f64 = points
        .iter()
        .map(|&(t, c)| {
            let r = c as f64 - (a + b * t as f64);
            r * r
        })
        .sum();
    Some((a as f32, b as f32, (sse / n).sqrt() as f32))
}

/// Lit runs and dark fraction of a ridge profile.
///
/// A sample is lit when it is above halfway between the background and the
/// profile's lit level. Only the span between the first and last lit sample
/// counts, and gaps shorter than [`MIN_DARK_GAP`] do not split a run.
fn modulation(ridge: &[f32], background: f32) -> (usize, f32) {
    if ridge.is_empty() {
        return (0, 0.0);
    }
    let level = percentile(ridge, LIT_PERCENTILE);
    let cut = background + 0.5 * (level - background);
    let lit: Vec<bool> = ridge.iter().map(|&v| v > cut).collect();

    let (Some(first), Some(last)) = (
        lit.iter().position(|&l| l),
        lit.iter().rposition(|&l| l),
    ) else {
        return (0, 0.0);
    };
    let span = &lit[first..=last];
    let dark = span.iter().filter(|&&l| !l).count();

    let mut runs = 1;
    let mut gap = 0;
    for &l in span {
        if l {
            if gap >= MIN_DARK_GAP {
                runs += 1;
            }
            gap = 0;
        } else {
            gap += 1;
        }
    }

    (runs, dark as f32 / span.len() as f32)
}
