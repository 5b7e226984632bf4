use crate::consts::{
    PARALLEL_ANGLE_DEG, SAME_LINE_ANGLE_DEG, SAME_LINE_OFFSET_PX, STREAK_FLANK_MIN_OVERLAP,
    STREAK_FLANK_OFFSET_PX,
};
use crate::lines::{angle_difference, LineSegment};

/// Evidence segments grouped onto the same infinite line.
#[derive(Clone, Debug)]
pub struct LineGroup {
    /// Indices into the segment slice handed to [`group_lines`].
    pub members: Vec<usize>,
    /// Non-overlapping pieces along the line.
    pub pieces: usize,
    /// Other lines within the parallel tolerance.
    pub parallel_companions: usize,
}

/// Line structure of one image, built from its evidence segments.
#[derive(Clone, Debug, Default)]
pub struct LineFamilies {
    pub lines: Vec<LineGroup>,
    /// Line index of each segment, `None` for segments that were not evidence.
    pub line_of: Vec<Option<usize>>,
    /// Size of the largest set of mutually parallel lines.
    pub largest_family: usize,
}

impl LineFamilies {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn group_for(&self, segment_index: usize) -> Option<&LineGroup> {
        self.line_of
            .get(segment_index)
            .copied()
            .flatten()
            .and_then(|l| self.lines.get(l))
    }
}

/// Group the segments flagged in `evidence` into lines and count parallel
/// companions between lines.
///
/// A segment joins the first line whose founding segment is collinear with
/// it, so longer segments (earlier in detector order) anchor the lines. The
/// two edge lines along the flanks of one wide streak also join a single
/// line, so a fireball is not its own parallel companion.
pub fn group_lines(segments: &[LineSegment], evidence: &[bool]) -> LineFamilies {
    let mut lines: Vec<LineGroup> = Vec::new();
    let mut line_of = vec![None; segments.len()];

    for (i, seg) in segments.iter().enumerate() {
        if !evidence.get(i).copied().unwrap_or(false) {
            continue;
        }
        let existing = lines.iter().position(|line| {
            let founder = &segments[line.members[0]];
            founder.is_collinear_with(seg, SAME_LINE_ANGLE_DEG, SAME_LINE_OFFSET_PX)
                || is_flank_pair(founder, seg)
        });
        match existing {
            Some(l) => {
                lines[l].members.push(i);
                line_of[i] = Some(l);
            }
            None => {
                line_of[i] = Some(lines.len());
                lines.push(LineGroup {
                    members: vec![i],
                    pieces: 1,
                    parallel_companions: 0,
                });
            }
        }
    }

    for line in &mut lines {
        line.pieces = count_pieces(segments, &line.members);
    }

    let angles: Vec<f32> = lines.iter().map(|l| segments[l.members[0]].angle).collect();
    for (i, line) in lines.iter_mut().enumerate() {
        line.parallel_companions = angles
            .iter()
            .enumerate()
            .filter(|&(j, &a)| j != i && angle_difference(a, angles[i]) <= PARALLEL_ANGLE_DEG)
            .count();
    }
    let largest_family = lines
        .iter()
        .map(|l| l.parallel_companions + 1)
        .max()
        .unwrap_or(0);

    LineFamilies {
        lines,
        line_of,
        largest_family,
    }
}

/// Whether `a` and `b` look like the two edges of one wide streak: same
/// direction, a streak width apart, running alongside each other.
fn is_flank_pair(a: &LineSegment, b: &LineSegment) -> bool {
    if !a.is_collinear_with(b, SAME_LINE_ANGLE_DEG, STREAK_FLANK_OFFSET_PX) {
        return false;
    }
    let shorter = a.length.min(b.length);
    shorter > 0.0 && a.overlap_length(b) >= STREAK_FLANK_MIN_OVERLAP * shorter
}

/// Lines parallel to `segment` among the grouped lines.
pub fn parallel_lines_to(segment: &LineSegment, segments: &[LineSegment], families: &LineFamilies) -> usize {
    families
        .lines
        .iter()
        .filter(|l| {
            let founder = &segments[l.members[0]];
            angle_difference(founder.angle, segment.angle) <= PARALLEL_ANGLE_DEG
        })
        .count()
}

/// Number of disjoint stretches covered by the members along their line.
fn count_pieces(segments: &[LineSegment], members: &[usize]) -> usize {
    let Some(&first) = members.first() else {
        return 0;
    };
    let anchor = &segments[first];
    let (dx, dy) = anchor.direction();
    let project = |x: f32, y: f32| (x - anchor.x1) * dx + (y - anchor.y1) * dy;

    let mut spans: Vec<(f32, f32)> = members
        .iter()
        .map(|&m| {
            let s = &segments[m];
            let a = project(s.x1, s.y1);
            let b = project(s.x2, s.y2);
            (a.min(b), a.max(b))
        })
        .collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut pieces = 0;
    let mut reach = f32::NEG_INFINITY;
    for (lo, hi) in spans {
        if lo > reach {
            pieces += 1;
        }
        reach = reach.max(hi);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashes_on_one_line_count_as_pieces() {
        let segs = vec![
            LineSegment::new(0.0, 50.0, 30.0, 50.0, 30),
            LineSegment::new(45.0, 51.0, 75.0, 51.0, 30),
            LineSegment::new(90.0, 50.0, 120.0, 50.0, 30),
        ];
        let families = group_lines(&segs, &[true, true, true]);
        assert_eq!(families.line_count(), 1);
        assert_eq!(families.lines[0].pieces, 3);
        assert_eq!(families.largest_family, 1);
    }

    #[test]
    fn test_flanks_of_a_wide_streak_are_one_line() {
        // Edges either side of a 10 px wide streak at about 33 degrees.
        let segs = vec![
            LineSegment::new(47.0, 64.6, 327.0, 246.6, 300),
            LineSegment::new(53.0, 55.4, 333.0, 237.4, 290),
        ];
        let families = group_lines(&segs, &[true, true]);
        assert_eq!(families.line_count(), 1);
        assert_eq!(families.lines[0].pieces, 1);
        assert_eq!(families.lines[0].parallel_companions, 0);
    }

    #[test]
    fn test_side_by_side_lines_need_overlap_to_merge() {
        // Same offset as two flanks, but end to end instead of alongside.
        let segs = vec![
            LineSegment::new(0.0, 50.0, 100.0, 50.0, 100),
            LineSegment::new(140.0, 61.0, 240.0, 61.0, 100),
        ];
        let families = group_lines(&segs, &[true, true]);
        assert_eq!(families.line_count(), 2);
        assert_eq!(families.largest_family, 2);
    }

    #[test]
    fn test_parallel_lines_form_a_family() {
        let segs: Vec<_> = (0..5)
            .map(|i| {
                let y = 20.0 + 30.0 * i as f32;
                LineSegment::new(10.0, y, 150.0, y + 10.0, 100)
            })
            .collect();
        let families = group_lines(&segs, &[true; 5]);
        assert_eq!(families.line_count(), 5);
        assert_eq!(families.largest_family, 5);
        assert!(families.lines.iter().all(|l| l.parallel_companions == 4));
    }
}
