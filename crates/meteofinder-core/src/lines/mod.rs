pub mod extract;
pub mod hough;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{
    DEFAULT_MAX_LINE_GAP, DEFAULT_MAX_PEAKS, DEFAULT_MAX_SEGMENTS, DEFAULT_MIN_SEGMENT_LENGTH,
    DEFAULT_MIN_VOTES,
};
use crate::edges::EdgeMap;

pub use extract::{consume_segment, dedup_segments, walk_peak};
pub use hough::{HoughAccumulator, HoughPeak};

/// A straight segment found in an edge map, in analysis-raster coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub length: f32,
    /// Direction in degrees, [0, 180). Image rows grow downwards.
    pub angle: f32,
    /// Number of edge samples supporting the segment.
    pub strength: u32,
}

impl LineSegment {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, strength: u32) -> Self {
        let dx = x2 - x1;
        let dy = y2 - y1;
        let length = (dx * dx + dy * dy).sqrt();
        let angle = dy.atan2(dx).to_degrees().rem_euclid(180.0);
        // rem_euclid can round up to exactly 180.0 for tiny negative inputs,
        // and leaves -0.0 for right-to-left horizontals
        let angle = if angle >= 180.0 || angle <= 0.0 { 0.0 } else { angle };
        Self {
            x1,
            y1,
            x2,
            y2,
            length,
            angle,
            strength,
        }
    }

    /// Unit vector from the first to the second endpoint.
    pub fn direction(&self) -> (f32, f32) {
        if self.length <= f32::EPSILON {
            return (1.0, 0.0);
        }
        ((self.x2 - self.x1) / self.length, (self.y2 - self.y1) / self.length)
    }

    /// Unit normal, the direction rotated by 90 degrees.
    pub fn normal(&self) -> (f32, f32) {
        let (dx, dy) = self.direction();
        (-dy, dx)
    }

    pub fn midpoint(&self) -> (f32, f32) {
        ((self.x1 + self.x2) * 0.5, (self.y1 + self.y2) * 0.5)
    }

    /// Signed distance of the infinite line from the image origin, measured
    /// along the normal of a direction canonicalized to `angle`.
    pub fn offset(&self) -> f32 {
        let theta = self.angle.to_radians();
        let (nx, ny) = (-theta.sin(), theta.cos());
        nx * self.x1 + ny * self.y1
    }

    /// Perpendicular distance of `(x, y)` from this segment's infinite line.
    pub fn distance_to_line(&self, x: f32, y: f32) -> f32 {
        let (nx, ny) = self.normal();
        ((x - self.x1) * nx + (y - self.y1) * ny).abs()
    }

    /// Whether the projections of the two segments onto this segment's
    /// direction overlap, allowing `slack` pixels between them.
    pub fn overlaps(&self, other: &LineSegment, slack: f32) -> bool {
        let (dx, dy) = self.direction();
        let project = |x: f32, y: f32| (x - self.x1) * dx + (y - self.y1) * dy;
        let a = project(other.x1, other.y1);
        let b = project(other.x2, other.y2);
        let (lo, hi) = (a.min(b), a.max(b));
        hi >= -slack && lo <= self.length + slack
    }

    /// Length (px) of `other` projected onto this segment that falls within
    /// this segment's own extent.
    pub fn overlap_length(&self, other: &LineSegment) -> f32 {
        let (dx, dy) = self.direction();
        let project = |x: f32, y: f32| (x - self.x1) * dx + (y - self.y1) * dy;
        let a = project(other.x1, other.y1);
        let b = project(other.x2, other.y2);
        (a.max(b).min(self.length) - a.min(b).max(0.0)).max(0.0)
    }

    /// Whether `other` lies on the same infinite line within the tolerances.
    pub fn is_collinear_with(&self, other: &LineSegment, max_angle: f32, max_offset: f32) -> bool {
        if angle_difference(self.angle, other.angle) > max_angle {
            return false;
        }
        let (mx, my) = other.midpoint();
        let (sx, sy) = self.midpoint();
        self.distance_to_line(mx, my) <= max_offset && other.distance_to_line(sx, sy) <= max_offset
    }

    /// Endpoints rescaled by `factor`.
    pub fn scaled(&self, factor: f32) -> LineSegment {
        LineSegment::new(
            self.x1 * factor,
            self.y1 * factor,
            self.x2 * factor,
            self.y2 * factor,
            self.strength,
        )
    }
}

/// Smallest difference between two undirected angles in degrees.
pub fn angle_difference(a: f32, b: f32) -> f32 {
    let d = (a - b).abs().rem_euclid(180.0);
    d.min(180.0 - d)
}

/// Configuration for the line detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Accumulator votes a Hough peak must reach.
    #[serde(default = "default_min_votes")]
    pub min_votes: u32,
    /// Strongest peaks walked for segments.
    #[serde(default = "default_max_peaks")]
    pub max_peaks: usize,
    /// Largest gap (px) bridged while walking a line.
    #[serde(default = "default_max_gap")]
    pub max_gap: usize,
    /// Shortest segment (px) emitted.
    #[serde(default = "default_min_segment_length")]
    pub min_segment_length: f32,
    /// Segments kept per image, longest first.
    #[serde(default = "default_max_segments")]
    pub max_segments: usize,
}

fn default_min_votes() -> u32 {
    DEFAULT_MIN_VOTES
}
fn default_max_peaks() -> usize {
    DEFAULT_MAX_PEAKS
}
fn default_max_gap() -> usize {
    DEFAULT_MAX_LINE_GAP
}
fn default_min_segment_length() -> f32 {
    DEFAULT_MIN_SEGMENT_LENGTH
}
fn default_max_segments() -> usize {
    DEFAULT_MAX_SEGMENTS
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            min_votes: DEFAULT_MIN_VOTES,
            max_peaks: DEFAULT_MAX_PEAKS,
            max_gap: DEFAULT_MAX_LINE_GAP,
            min_segment_length: DEFAULT_MIN_SEGMENT_LENGTH,
            max_segments: DEFAULT_MAX_SEGMENTS,
        }
    }
}

/// Find straight segments in an edge map.
///
/// Output is ordered longest first, ties broken by higher strength. An edge
/// map with no lines yields an empty vector.
pub fn detect_lines(edges: &EdgeMap, config: &LineConfig) -> Vec<LineSegment> {
    if edges.width() == 0 || edges.height() == 0 || edges.edge_count() == 0 {
        return Vec::new();
    }

    let acc = HoughAccumulator::accumulate(edges);
    let peaks = acc.peaks(config.min_votes, config.max_peaks);

    // Strongest peaks first; each found segment consumes its edge pixels.
    let mut remaining = edges.clone();
    let mut segments: Vec<LineSegment> = Vec::new();
    for peak in &peaks {
        for segment in walk_peak(&remaining, &acc, peak, config) {
            consume_segment(&mut remaining, &segment);
            segments.push(segment);
        }
    }
    let found = segments.len();

    segments = dedup_segments(segments);
    segments.sort_by(|a, b| {
        b.length
            .total_cmp(&a.length)
            .then(b.strength.cmp(&a.strength))
    });
    segments.truncate(config.max_segments);

    debug!(
        peaks = peaks.len(),
        walked = found,
        kept = segments.len(),
        "Detected line segments"
    );
    segments
}
