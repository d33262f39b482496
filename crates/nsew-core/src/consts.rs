/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f32 = 1e-10;

/// ITU-R BT.601 luminance coefficients (R, G, B).
pub const LUMINANCE_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Current alignment parameter schema version.
pub const PARAMS_SCHEMA_VERSION: &str = "1.0";

/// File name of the alignment parameter file written after each original stitch.
pub const DEFAULT_PARAMS_FILENAME: &str = ".nsew_alignment.json";

/// Fraction of each tile, measured from the shared border, searched for features.
/// Matches the 50% upper bound on the configurable overlap.
pub const BORDER_SEARCH_FRACTION: f64 = 0.5;

/// Upper bound on keypoints kept per tile after non-maximum suppression.
pub const MAX_KEYPOINTS: usize = 800;

/// Minimum number of matches needed before a robust fit is attempted.
pub const MIN_MATCHES: usize = 4;

/// Minimum RANSAC inliers for a border fit to be used.
pub const MIN_INLIERS: usize = 3;

/// Lowe ratio test threshold for nearest-neighbour descriptor matching.
pub const MATCH_RATIO: f32 = 0.8;

/// RANSAC inlier radius in pixels.
pub const RANSAC_INLIER_RADIUS: f64 = 3.0;

/// Number of RANSAC hypotheses drawn (capped at the match count).
pub const RANSAC_ITERATIONS: usize = 200;

/// Inlier count at which a border confidence reaches ~63% of its inlier ratio.
pub const CONFIDENCE_MATCH_SCALE: f64 = 10.0;

/// Weight of the usable-border fraction in the overall confidence.
pub const BORDER_COVERAGE_WEIGHT: f64 = 0.4;

/// Number of border pairs in a full 2x2 grid.
pub const BORDER_COUNT: usize = 4;

/// Maximum number of Laplacian pyramid levels for multiband blending.
pub const MULTIBAND_MAX_LEVELS: usize = 5;

/// Gaussian sigma used when building blend pyramids.
pub const PYRAMID_BLUR_SIGMA: f32 = 1.0;

/// Default feather band width in pixels.
pub const DEFAULT_FEATHER_WIDTH: u32 = 16;

/// Width in pixels of the neighbour strip sampled by the interpolate fill.
pub const INTERPOLATE_STRIP_WIDTH: usize = 8;

/// Canvases larger than this on either axis get a downsampled display copy.
pub const MAX_DISPLAY_DIMENSION: usize = 4096;

/// Default RNG seed for descriptor patterns and robust sampling.
pub const DEFAULT_FEATURE_SEED: u64 = 0x4E53_4557;

/// File extensions probed when looking for sibling and chip images.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["tif", "tiff", "png", "jpg", "jpeg", "bmp"];
