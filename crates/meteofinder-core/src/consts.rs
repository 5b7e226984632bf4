/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.114;

/// Longest side (in pixels) an image is downsampled to before analysis.
pub const MAX_ANALYSIS_DIMENSION: u32 = 1500;

/// Default Gaussian blur sigma applied before edge extraction.
pub const DEFAULT_EDGE_BLUR_SIGMA: f32 = 1.0;

/// Default Sobel magnitude (on a [0, 1] raster) an edge pixel must reach.
pub const DEFAULT_EDGE_THRESHOLD: f32 = 0.25;

/// Angular resolution of the Hough accumulator, in bins per 180 degrees.
pub const HOUGH_THETA_BINS: usize = 180;

/// Default minimum accumulator votes for a Hough peak. Keeps noisy frames from
/// exploding the peak list; it is not the meteor threshold.
pub const DEFAULT_MIN_VOTES: u32 = 15;

/// Half-width (in theta bins) of the Hough peak suppression window.
pub const HOUGH_PEAK_THETA_RADIUS: usize = 2;

/// Half-width (in rho bins) of the Hough peak suppression window.
pub const HOUGH_PEAK_RHO_RADIUS: usize = 4;

/// Default number of Hough peaks walked for segments.
pub const DEFAULT_MAX_PEAKS: usize = 96;

/// Default number of segments emitted per image.
pub const DEFAULT_MAX_SEGMENTS: usize = 48;

/// Default largest gap (px) bridged while walking a Hough line.
pub const DEFAULT_MAX_LINE_GAP: usize = 10;

/// Default shortest segment (px) the line detector emits.
pub const DEFAULT_MIN_SEGMENT_LENGTH: f32 = 10.0;

/// Perpendicular tolerance (px) when collecting edge pixels along a Hough line.
pub const LINE_WALK_BAND: i32 = 2;

/// Half-width (px) of the strip of edge pixels a found segment consumes, so
/// weaker peaks crossing the same streak find nothing left to walk.
pub const LINE_CONSUME_BAND: f32 = 6.0;

/// Half-width (px) searched across a segment for the streak ridge.
pub const RIDGE_HALF_WIDTH: i32 = 3;

/// Perpendicular distance (px) at which the sky background is sampled.
pub const BACKGROUND_OFFSET: f32 = 8.0;

/// Default minimum ridge-over-background contrast for a streak.
pub const DEFAULT_MIN_CONTRAST: f32 = 0.08;

/// Segment length (px at full resolution) that earns the full length term.
pub const REFERENCE_STREAK_LENGTH: f32 = 200.0;

/// Contrast that earns the full contrast term.
pub const REFERENCE_CONTRAST: f32 = 0.30;

/// Curvature (px RMS) at which the straightness term reaches zero.
pub const CURVATURE_SCALE: f32 = 3.0;

/// Minimum length (px at full resolution) for a segment to count as line evidence.
pub const DEFAULT_EVIDENCE_MIN_LENGTH: f32 = 20.0;

/// Angular tolerance (degrees) for two segments to lie on the same line.
pub const SAME_LINE_ANGLE_DEG: f32 = 2.0;

/// Offset tolerance (px) for two segments to lie on the same line.
pub const SAME_LINE_OFFSET_PX: f32 = 8.0;

/// Largest offset (px) between the two flank edge lines of one wide streak:
/// the ridge search width plus a consumed strip on each side.
pub const STREAK_FLANK_OFFSET_PX: f32 = 2.0 * RIDGE_HALF_WIDTH as f32 + 2.0 * LINE_CONSUME_BAND;

/// Fraction of the shorter flank that must run alongside the other flank.
pub const STREAK_FLANK_MIN_OVERLAP: f32 = 0.5;

/// Angular tolerance (degrees) for two lines to be considered parallel.
pub const PARALLEL_ANGLE_DEG: f32 = 3.0;

/// Default family size of parallel lines treated as a star-trail field.
pub const DEFAULT_STAR_TRAIL_FAMILY: usize = 4;

/// Default number of distinct lines above which the frame counts as cluttered.
pub const DEFAULT_CLUTTER_LIMIT: usize = 6;

/// Default parallel companions at which a segment is treated as aircraft lights.
pub const DEFAULT_MAX_PARALLEL_COMPANIONS: usize = 2;

/// Collinear pieces that make a line dashed (blinking lights).
pub const DASHED_LINE_PIECES: usize = 3;

/// Default raw file size (bytes) sent to the verification service unchanged.
/// Base64 adds about a third, keeping requests under a 5 MB image limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 3_500_000;

/// Starting longest side (px) when an upload has to be downscaled.
pub const UPLOAD_START_DIMENSION: u32 = 2000;

/// Smallest longest side (px) tried when downscaling an upload.
pub const UPLOAD_MIN_DIMENSION: u32 = 800;

/// Step (px) by which the upload dimension shrinks between attempts.
pub const UPLOAD_DIMENSION_STEP: u32 = 200;

/// Default estimated cost (USD) of one verification call.
pub const DEFAULT_COST_PER_CALL_USD: f64 = 0.005;

/// Default number of concurrent verification calls.
pub const DEFAULT_MAX_CONCURRENCY: usize = 2;

/// Default minimum interval between verification calls, in milliseconds.
pub const DEFAULT_MIN_CALL_INTERVAL_MS: u64 = 1000;

/// Default request timeout for the verification service, in seconds.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 60;

/// Default consecutive remote failures before the run degrades to local-only.
pub const DEFAULT_FALLBACK_AFTER: usize = 3;
