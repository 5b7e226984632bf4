use crate::consts::{LINE_CONSUME_BAND, LINE_WALK_BAND};
use crate::edges::EdgeMap;

use super::hough::{HoughAccumulator, HoughPeak};
use super::{angle_difference, LineConfig, LineSegment};

/// Angular tolerance (degrees) for two walked segments to be duplicates.
const DUPLICATE_ANGLE_DEG: f32 = 2.0;
/// Offset tolerance (px) for two walked segments to be duplicates.
const DUPLICATE_OFFSET_PX: f32 = 3.0;

/// Walk the infinite line of a Hough peak across the edge map and cut it
/// into segments wherever more than `max_gap` consecutive samples miss.
///
/// A sample hits when any edge pixel lies within the walk band across the
/// line. Endpoints sit on the ideal line at the first and last hit of a run.
pub fn walk_peak(
    edges: &EdgeMap,
    acc: &HoughAccumulator,
    peak: &HoughPeak,
    config: &LineConfig,
) -> Vec<LineSegment> {
    let (c, s) = acc.cos_sin(peak.theta_bin);
    // Foot of the normal and the line direction.
    let (px, py) = (peak.rho * c, peak.rho * s);
    let (dx, dy) = (-s, c);
    let reach = acc.rho_offset as i64;

    let hit_at = |t: i64| -> bool {
        let x = px + t as f32 * dx;
        let y = py + t as f32 * dy;
        (-LINE_WALK_BAND..=LINE_WALK_BAND).any(|k| {
            let sx = (x + k as f32 * c).round() as i64;
            let sy = (y + k as f32 * s).round() as i64;
            edges.is_edge(sx, sy)
        })
    };

    let mut segments = Vec::new();
    let mut run: Option<(i64, i64, u32)> = None;
    let max_gap = config.max_gap as i64;

    for t in -reach..=reach {
        if !hit_at(t) {
            continue;
        }
        run = match run {
            Some((start, last, hits)) if t - last <= max_gap + 1 => Some((start, t, hits + 1)),
            Some(done) => {
                push_run(&mut segments, done, (px, py), (dx, dy), config);
                Some((t, t, 1))
            }
            None => Some((t, t, 1)),
        };
    }
    if let Some(done) = run {
        push_run(&mut segments, done, (px, py), (dx, dy), config);
    }

    segments
}

fn push_run(
    out: &mut Vec<LineSegment>,
    (start, end, hits): (i64, i64, u32),
    (px, py): (f32, f32),
    (dx, dy): (f32, f32),
    config: &LineConfig,
) {
    if ((end - start) as f32) < config.min_segment_length {
        return;
    }
    out.push(LineSegment::new(
        px + start as f32 * dx,
        py + start as f32 * dy,
        px + end as f32 * dx,
        py + end as f32 * dy,
        hits,
    ));
}

/// Clear the edge pixels within [`LINE_CONSUME_BAND`] of `segment`.
///
/// Peaks are walked strongest first; once a streak has produced a segment,
/// the slightly tilted peaks that cross it must not produce segments of
/// their own.
pub fn consume_segment(edges: &mut EdgeMap, segment: &LineSegment) {
    let (dx, dy) = segment.direction();
    let (nx, ny) = segment.normal();
    let (h, w) = (edges.height() as i64, edges.width() as i64);
    // Half-pixel steps so diagonal strips have no holes.
    let along = (segment.length * 2.0).ceil() as i64;
    let across = (LINE_CONSUME_BAND * 2.0).ceil() as i64;

    for i in 0..=along {
        let t = i as f32 * 0.5;
        for j in -across..=across {
            let k = j as f32 * 0.5;
            let x = (segment.x1 + t * dx + k * nx).round() as i64;
            let y = (segment.y1 + t * dy + k * ny).round() as i64;
            if x >= 0 && y >= 0 && x < w && y < h {
                edges.mask[[y as usize, x as usize]] = false;
            }
        }
    }
}

/// Merge near-duplicate segments (same angle, nearly the same offset and
/// overlapping), keeping the stronger of each pair.
pub fn dedup_segments(mut segments: Vec<LineSegment>) -> Vec<LineSegment> {
    segments.sort_by(|a, b| {
        b.strength
            .cmp(&a.strength)
            .then(b.length.total_cmp(&a.length))
    });

    let mut kept: Vec<LineSegment> = Vec::with_capacity(segments.len());
    for seg in segments {
        let duplicate = kept.iter().any(|k| {
            angle_difference(k.angle, seg.angle) <= DUPLICATE_ANGLE_DEG
                && {
                    let (mx, my) = seg.midpoint();
                    k.distance_to_line(mx, my) <= DUPLICATE_OFFSET_PX
                }
                && k.overlaps(&seg, 0.0)
        });
        if !duplicate {
            kept.push(seg);
        }
    }
    kept
}
