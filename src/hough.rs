//! Line detection via the [Hough transform].
//!
//! Lines are parameterised as `rho = row * cos(theta) + col * sin(theta)` with
//! `theta` sampled over `[0, 2π)`, so the accumulator only stores non-negative `rho`.
//! Peaks are grouped with the crate's connected component labeller and reduced to
//! their vote-weighted centre.
//!
//! [Hough transform]: https://en.wikipedia.org/wiki/Hough_transform

use std::f64::consts::{PI, TAU};

use image::Luma;
use imageproc::drawing::BresenhamLineIter;
use log::{debug, warn};

use crate::Grid;
use crate::contrast::threshold_inclusive_mut;
use crate::drawing::draw_segment_mut;
use crate::region_labelling::{LabelOptions, label_components_mut};

/// A detected line, in polar coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarLine {
    /// Distance from the origin (top-left pixel), in pixels.
    pub rho: f64,
    /// Angle of the line normal from the row axis towards the column axis, in radians.
    pub theta: f64,
}

/// Sampling of the accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughOptions {
    /// Height of one accumulator row, in pixels.
    pub rho_step: f64,
    /// Width of one accumulator column, in radians.
    pub theta_step: f64,
}

impl Default for HoughOptions {
    fn default() -> Self {
        Self {
            rho_step: 1.0,
            theta_step: PI / 180.0,
        }
    }
}

impl HoughOptions {
    /// Sampling of an accumulator produced by [`bucket`] with the given block size.
    pub fn bucketed(self, size: u32) -> Self {
        Self {
            rho_step: self.rho_step * f64::from(size),
            theta_step: self.theta_step * f64::from(size),
        }
    }
}

/// Options for cutting detected lines down to the stretches backed by edge pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimOptions {
    /// Longest run of non-edge pixels bridged inside one segment.
    pub gap_tolerance: u32,
    /// Segments must be strictly longer than this to be drawn.
    pub min_length: u32,
}

impl Default for TrimOptions {
    fn default() -> Self {
        Self {
            gap_tolerance: 10,
            min_length: 50,
        }
    }
}

/// Returns `(rows, cols)` of the accumulator for a `rows × cols` image.
pub fn accumulator_dimensions(rows: u32, cols: u32, options: &HoughOptions) -> (u32, u32) {
    let diagonal = (f64::from(rows).powi(2) + f64::from(cols).powi(2))
        .sqrt()
        .round();
    let rho_bins = (diagonal / options.rho_step).round() as u32;
    let theta_bins = (TAU / options.theta_step).round() as u32;
    (rho_bins, theta_bins)
}

/// Builds the voting accumulator of a binary image.
///
/// Every pixel equal to 255 votes once per sampled angle, in the row of its rounded
/// `rho`. Votes falling outside `[0, rows)` are dropped. The result has one row per
/// `rho` bin and one column per `theta` bin.
pub fn accumulate(binary: &Grid, options: &HoughOptions) -> Grid {
    let (rho_bins, theta_bins) = accumulator_dimensions(binary.height(), binary.width(), options);
    let mut accumulator = Grid::new(theta_bins, rho_bins);

    let trig: Vec<(f64, f64)> = (0..theta_bins)
        .map(|i| (f64::from(i) * options.theta_step).sin_cos())
        .collect();

    let mut voters = 0usize;
    for (x, y, pixel) in binary.enumerate_pixels() {
        if pixel[0] != 255 {
            continue;
        }
        voters += 1;
        for (column, &(sin, cos)) in trig.iter().enumerate() {
            let rho = f64::from(y) * cos + f64::from(x) * sin;
            let row = (rho / options.rho_step).round();
            if row >= 0.0 && row < f64::from(rho_bins) {
                accumulator.get_pixel_mut(column as u32, row as u32)[0] += 1;
            }
        }
    }

    debug!(
        "accumulated {voters} voting pixels into a {rho_bins}x{theta_bins} accumulator"
    );
    accumulator
}

/// Sums the accumulator over `size × size` blocks.
///
/// Trailing rows and columns that do not fill a whole block are added to the last
/// full block of their row or column.
///
/// # Panics
///
/// Panics if `size` is 0.
pub fn bucket(accumulator: &Grid, size: u32) -> Grid {
    assert!(size > 0, "bucket size must be positive");

    let width = accumulator.width() / size;
    let height = accumulator.height() / size;
    let mut bucketed = Grid::new(width, height);
    if width == 0 || height == 0 {
        return bucketed;
    }

    for (x, y, pixel) in accumulator.enumerate_pixels() {
        let target = bucketed.get_pixel_mut((x / size).min(width - 1), (y / size).min(height - 1));
        target[0] = target[0].saturating_add(pixel[0]);
    }
    bucketed
}

/// Finds one line per cluster of accumulator cells with at least `threshold` votes.
///
/// Clusters are the connected components of the thresholded accumulator; each yields
/// the line at its vote-weighted centre. Clusters without any votes are skipped.
/// Lines come out in the raster order of their clusters' first cells.
pub fn find_line_peaks(accumulator: &Grid, threshold: u32, options: &HoughOptions) -> Vec<PolarLine> {
    let mut clusters = accumulator.clone();
    threshold_inclusive_mut(&mut clusters, threshold);
    let components = label_components_mut(&mut clusters, &LabelOptions::sequential());

    // (weighted row sum, weighted col sum, votes), indexed by sequential label
    let mut sums = vec![(0.0f64, 0.0f64, 0u64); components.len() + 1];
    for (x, y, pixel) in clusters.enumerate_pixels() {
        let label = pixel[0] as usize;
        if label == 0 {
            continue;
        }
        let votes = accumulator.get_pixel(x, y)[0];
        let entry = &mut sums[label];
        entry.0 += f64::from(y) * f64::from(votes);
        entry.1 += f64::from(x) * f64::from(votes);
        entry.2 += u64::from(votes);
    }

    let lines: Vec<PolarLine> = sums
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(label, &(row_sum, col_sum, votes))| {
            if votes == 0 {
                warn!("accumulator cluster {label} has no votes, skipping");
                return None;
            }
            let votes = votes as f64;
            Some(PolarLine {
                rho: row_sum / votes * options.rho_step,
                theta: col_sum / votes * options.theta_step,
            })
        })
        .collect();

    debug!(
        "found {} lines from {} clusters at threshold {threshold}",
        lines.len(),
        components.len()
    );
    lines
}

/// Returns where `line` crosses the border of a `rows × cols` grid, as `(row, col)`.
///
/// Candidates are the crossings with column 0, row 0, the last column and the last row.
/// Crossings outside the grid or at non-finite positions are ignored, as are repeats of
/// the same pixel (a line through a corner). Returns the first two distinct crossings, or
/// `None` when the line misses the grid.
pub fn polar_to_cartesian(rows: u32, cols: u32, line: PolarLine) -> Option<((i64, i64), (i64, i64))> {
    let (sin, cos) = line.theta.sin_cos();
    let last_row = f64::from(rows) - 1.0;
    let last_col = f64::from(cols) - 1.0;

    let candidates = [
        (line.rho / cos, 0.0),
        (0.0, line.rho / sin),
        ((line.rho - last_col * sin) / cos, last_col),
        (last_row, (line.rho - last_row * cos) / sin),
    ];

    let mut crossings: Vec<(i64, i64)> = Vec::with_capacity(candidates.len());
    for (row, col) in candidates {
        if !row.is_finite() || !col.is_finite() {
            continue;
        }
        let (row, col) = (row.round(), col.round());
        if row < 0.0 || col < 0.0 || row > last_row || col > last_col {
            continue;
        }
        let crossing = (row as i64, col as i64);
        if !crossings.contains(&crossing) {
            crossings.push(crossing);
        }
    }

    match crossings[..] {
        [start, end, ..] => Some((start, end)),
        _ => None,
    }
}

/// Rasterises the segment between two `(row, col)` points.
pub fn line_points(start: (i64, i64), end: (i64, i64)) -> Vec<(i64, i64)> {
    BresenhamLineIter::new(
        (start.1 as f32, start.0 as f32),
        (end.1 as f32, end.0 as f32),
    )
    .map(|(x, y)| (i64::from(y), i64::from(x)))
    .collect()
}

/// Draws every line across the full extent of the grid.
pub fn draw_polar_lines_mut(grid: &mut Grid, lines: &[PolarLine], value: u32) {
    for line in lines {
        if let Some((start, end)) = polar_to_cartesian(grid.height(), grid.width(), *line) {
            draw_segment_mut(grid, to_f32(start), to_f32(end), value);
        }
    }
}

/// Draws only the stretches of each line that are backed by pixels of a binary edge map.
///
/// Walking along the line, consecutive edge pixels grow a segment, runs of up to
/// `gap_tolerance` non-edge pixels are bridged, and a longer run closes the segment.
/// Closed segments longer than `min_length` pixels are drawn. Returns the number of
/// segments drawn.
pub fn draw_trimmed_lines_mut(
    grid: &mut Grid,
    edges: &Grid,
    lines: &[PolarLine],
    options: &TrimOptions,
    value: u32,
) -> usize {
    let mut segments = Vec::new();
    for line in lines {
        let Some((start, end)) = polar_to_cartesian(grid.height(), grid.width(), *line) else {
            continue;
        };

        let mut tracker = SegmentTracker::new(options);
        for point in line_points(start, end) {
            if let Some(segment) = tracker.step(point, is_edge(edges, point)) {
                segments.push(segment);
            }
        }
        segments.extend(tracker.close());
    }

    for &(start, end) in &segments {
        draw_segment_mut(grid, to_f32(start), to_f32(end), value);
    }
    debug!("drew {} trimmed segments for {} lines", segments.len(), lines.len());
    segments.len()
}

fn is_edge(edges: &Grid, (row, col): (i64, i64)) -> bool {
    match (u32::try_from(col), u32::try_from(row)) {
        (Ok(x), Ok(y)) => edges.get_pixel_checked(x, y).is_some_and(|p: &Luma<u32>| p[0] != 0),
        _ => false,
    }
}

fn to_f32((row, col): (i64, i64)) -> (f32, f32) {
    (row as f32, col as f32)
}

type Segment = ((i64, i64), (i64, i64));

struct SegmentTracker {
    gap_tolerance: u32,
    min_length: u32,
    start: Option<(i64, i64)>,
    end: (i64, i64),
    length: u32,
    gap: u32,
}

impl SegmentTracker {
    fn new(options: &TrimOptions) -> Self {
        Self {
            gap_tolerance: options.gap_tolerance,
            min_length: options.min_length,
            start: None,
            end: (0, 0),
            length: 0,
            gap: 0,
        }
    }

    fn step(&mut self, point: (i64, i64), is_edge: bool) -> Option<Segment> {
        if is_edge {
            if self.start.is_none() {
                self.start = Some(point);
                self.length = 1;
            } else {
                self.length += self.gap + 1;
            }
            self.end = point;
            self.gap = 0;
            return None;
        }

        self.start?;
        self.gap += 1;
        if self.gap > self.gap_tolerance {
            self.close()
        } else {
            None
        }
    }

    /// Ends the open segment, returning it if it is long enough.
    fn close(&mut self) -> Option<Segment> {
        let start = self.start.take()?;
        let long_enough = self.length > self.min_length;
        self.length = 0;
        self.gap = 0;
        long_enough.then_some((start, self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {expected}, got {actual}"
        );
    }

    fn horizontal_edges(width: u32, columns: impl IntoIterator<Item = u32>) -> Grid {
        let mut edges = Grid::new(width, 5);
        for x in columns {
            edges.put_pixel(x, 2, Luma([255]));
        }
        edges
    }

    const ROW_TWO: PolarLine = PolarLine {
        rho: 2.0,
        theta: 0.0,
    };

    #[test]
    fn default_accumulator_covers_the_diagonal_and_full_circle() {
        assert_eq!(
            accumulator_dimensions(3, 4, &HoughOptions::default()),
            (5, 360)
        );
        assert_eq!(
            accumulator_dimensions(3, 4, &HoughOptions::default().bucketed(2)),
            (3, 180)
        );
    }

    #[test]
    fn origin_pixel_votes_for_rho_zero_at_every_angle() {
        let mut binary = Grid::new(4, 3);
        binary.put_pixel(0, 0, Luma([255]));
        let accumulator = accumulate(&binary, &HoughOptions::default());

        assert_eq!(accumulator.dimensions(), (360, 5));
        assert!((0..360).all(|x| accumulator.get_pixel(x, 0)[0] == 1));
        assert_eq!(accumulator.pixels().map(|p| p[0]).sum::<u32>(), 360);
    }

    #[test]
    fn horizontal_line_peaks_at_theta_zero() {
        let mut binary = Grid::new(6, 5);
        for x in 0..6 {
            binary.put_pixel(x, 2, Luma([255]));
        }
        // Non-255 pixels do not vote.
        binary.put_pixel(0, 4, Luma([100]));
        let accumulator = accumulate(&binary, &HoughOptions::default());

        assert_eq!(accumulator.get_pixel(0, 2)[0], 6);
        assert_eq!(accumulator.pixels().map(|p| p[0]).max(), Some(6));
    }

    #[test]
    fn bucket_folds_partial_blocks_into_the_last_bucket() {
        let ones = Grid::from_pixel(5, 5, Luma([1]));
        let bucketed = bucket(&ones, 2);
        assert_eq!(bucketed.dimensions(), (2, 2));
        assert_eq!(bucketed.into_raw(), vec![4, 6, 6, 9]);
    }

    #[test]
    fn bucket_of_one_is_identity() {
        let accumulator = Grid::from_fn(4, 3, |x, y| Luma([x * 10 + y]));
        assert_eq!(bucket(&accumulator, 1), accumulator);
    }

    #[test]
    fn peaks_are_vote_weighted_cluster_centres() {
        let mut accumulator = Grid::new(60, 30);
        accumulator.put_pixel(45, 10, Luma([10]));
        for (x, y) in [(44, 10), (46, 10), (45, 9), (45, 11)] {
            accumulator.put_pixel(x, y, Luma([5]));
        }
        accumulator.put_pixel(5, 25, Luma([8]));
        accumulator.put_pixel(20, 20, Luma([4]));

        let lines = find_line_peaks(&accumulator, 5, &HoughOptions::default());

        assert_eq!(lines.len(), 2);
        assert_close(lines[0].rho, 10.0, 1e-9);
        assert_close(lines[0].theta, 45f64.to_radians(), 1e-9);
        assert_close(lines[1].rho, 25.0, 1e-9);
        assert_close(lines[1].theta, 5f64.to_radians(), 1e-9);
    }

    #[test]
    fn clusters_without_votes_are_skipped() {
        let accumulator = Grid::new(10, 10);
        assert!(find_line_peaks(&accumulator, 0, &HoughOptions::default()).is_empty());
    }

    #[test]
    fn horizontal_line_crosses_left_and_right_borders() {
        assert_eq!(polar_to_cartesian(5, 100, ROW_TWO), Some(((2, 0), (2, 99))));
    }

    #[test]
    fn vertical_line_crosses_top_and_bottom_borders() {
        let column_three = PolarLine {
            rho: 3.0,
            theta: std::f64::consts::FRAC_PI_2,
        };
        assert_eq!(
            polar_to_cartesian(5, 10, column_three),
            Some(((0, 3), (4, 3)))
        );
    }

    #[test]
    fn line_outside_the_grid_has_no_crossings() {
        let far = PolarLine {
            rho: 500.0,
            theta: 0.0,
        };
        assert_eq!(polar_to_cartesian(5, 5, far), None);
        assert_eq!(polar_to_cartesian(0, 0, ROW_TWO), None);
    }

    #[test]
    fn full_lines_span_the_grid() {
        let mut grid = Grid::new(5, 5);
        draw_polar_lines_mut(&mut grid, &[ROW_TWO], 255);
        assert!((0..5).all(|x| grid.get_pixel(x, 2)[0] == 255));
        assert!((0..5).all(|x| grid.get_pixel(x, 1)[0] == 0));
    }

    #[test]
    fn line_points_follow_the_row() {
        let points = line_points((2, 0), (2, 3));
        assert_eq!(points, vec![(2, 0), (2, 1), (2, 2), (2, 3)]);
    }

    #[test]
    fn trimmed_line_stops_where_edges_end() {
        let edges = horizontal_edges(100, 0..60);
        let mut grid = Grid::new(100, 5);
        let drawn = draw_trimmed_lines_mut(&mut grid, &edges, &[ROW_TWO], &TrimOptions::default(), 255);

        assert_eq!(drawn, 1);
        assert_eq!(grid.get_pixel(30, 2)[0], 255);
        assert_eq!(grid.get_pixel(59, 2)[0], 255);
        assert_eq!(grid.get_pixel(60, 2)[0], 0);
        assert_eq!(grid.get_pixel(80, 2)[0], 0);
    }

    #[test]
    fn short_segments_are_dropped() {
        let edges = horizontal_edges(100, 0..20);
        let mut grid = Grid::new(100, 5);
        let drawn = draw_trimmed_lines_mut(&mut grid, &edges, &[ROW_TWO], &TrimOptions::default(), 255);
        assert_eq!(drawn, 0);
        assert!(grid.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn small_gaps_are_bridged() {
        let edges = horizontal_edges(100, (0..30).chain(35..65));
        let mut grid = Grid::new(100, 5);
        let drawn = draw_trimmed_lines_mut(&mut grid, &edges, &[ROW_TWO], &TrimOptions::default(), 255);
        assert_eq!(drawn, 1);
        assert_eq!(grid.get_pixel(32, 2)[0], 255);
        assert_eq!(grid.get_pixel(64, 2)[0], 255);
        assert_eq!(grid.get_pixel(66, 2)[0], 0);
    }

    #[test]
    fn open_segment_is_flushed_at_the_border() {
        let edges = horizontal_edges(100, 40..100);
        let mut grid = Grid::new(100, 5);
        let drawn = draw_trimmed_lines_mut(&mut grid, &edges, &[ROW_TWO], &TrimOptions::default(), 255);
        assert_eq!(drawn, 1);
        assert_eq!(grid.get_pixel(99, 2)[0], 255);
        assert_eq!(grid.get_pixel(39, 2)[0], 0);
    }
}
