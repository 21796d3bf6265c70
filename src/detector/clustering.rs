//! Row and cell grouping of dot detections.
//!
//! Points are split into rows along y and into cells along x using
//! thresholds derived from the frame's own gap statistics, so the grouping
//! follows the camera distance instead of fixed pixel constants. Each cell
//! then gets a grid frame: the box in which its six dot positions sit.

use crate::decoder::config::ClusterConfig;
use crate::models::{CellBBox, CellRegion, Point};

/// Smallest extent (px) treated as a real measurement
const MIN_EXTENT: f32 = 1.0;

/// Band height, in dot pitches, at which a row spans all three dot rows
const FULL_BAND: f32 = 1.9;

/// One text line of cells, ordered left to right
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Cells with their grid frames
    pub cells: Vec<CellRegion>,
    /// Dot pitch used for the frames, if any could be established
    pub dot_pitch: Option<f32>,
}

/// Separation threshold for sorted coordinates: `max(floor, mean_gap * factor)`
pub fn adaptive_threshold(sorted: &[f32], floor: f32, factor: f32) -> f32 {
    if sorted.len() < 2 {
        return floor;
    }
    let span: f32 = sorted.windows(2).map(|w| w[1] - w[0]).sum();
    let mean = span / (sorted.len() - 1) as f32;
    floor.max(mean * factor)
}

fn split_by_gap(points: Vec<Point>, coord: fn(&Point) -> f32, threshold: f32) -> Vec<Vec<Point>> {
    let mut groups = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    for p in points {
        if let Some(last) = current.last() {
            if coord(&p) - coord(last) > threshold {
                groups.push(std::mem::take(&mut current));
            }
        }
        current.push(p);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Group points into rows of cells.
///
/// Rows come out top to bottom, cells left to right, and each cell's points
/// by y then x. The result depends only on the set of points, not on their
/// input order.
pub fn cluster_points(points: &[Point], config: &ClusterConfig) -> Vec<Row> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.cmp_yx(b));
    let ys: Vec<f32> = sorted.iter().map(|p| p.y).collect();
    let row_threshold = adaptive_threshold(&ys, config.row_floor, config.row_factor);

    let layouts: Vec<RowLayout> = split_by_gap(sorted, |p| p.y, row_threshold)
        .into_iter()
        .map(|row_points| RowLayout::measure(row_points, config))
        .collect();
    // Full-height rows fix the page's line grid for the short ones.
    let anchors: Vec<f32> = layouts
        .iter()
        .filter(|r| r.is_full())
        .map(|r| r.top)
        .collect();
    layouts
        .into_iter()
        .map(|layout| layout.into_row(&anchors, config))
        .collect()
}

/// A row's cells before its vertical band is settled
struct RowLayout {
    clusters: Vec<Vec<Point>>,
    bounds: Vec<CellBBox>,
    top: f32,
    bottom: f32,
    pitch: Option<f32>,
}

impl RowLayout {
    fn measure(mut row_points: Vec<Point>, config: &ClusterConfig) -> Self {
        let top = row_points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let bottom = row_points.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);

        row_points.sort_by(|a, b| a.cmp_xy(b));
        let xs: Vec<f32> = row_points.iter().map(|p| p.x).collect();
        let cell_threshold = adaptive_threshold(&xs, config.cell_floor, config.cell_factor);
        let clusters = split_by_gap(row_points, |p| p.x, cell_threshold);
        let bounds: Vec<CellBBox> = clusters
            .iter()
            .filter_map(|c| CellBBox::from_points(c))
            .collect();
        let pitch = row_dot_pitch(&bounds, bottom - top, config);

        Self {
            clusters,
            bounds,
            top,
            bottom,
            pitch,
        }
    }

    /// Dots span all three dot rows, so the band is known
    fn is_full(&self) -> bool {
        self.pitch
            .is_some_and(|p| self.bottom - self.top >= FULL_BAND * p)
    }

    fn into_row(self, anchors: &[f32], config: &ClusterConfig) -> Row {
        let Some(pitch) = self.pitch else {
            let (top, bottom) = (self.top, self.bottom);
            let cells = self
                .clusters
                .into_iter()
                .zip(self.bounds)
                .map(|(points, b)| CellRegion::new(points, CellBBox::new(b.left, top, b.right, bottom)))
                .collect();
            return Row {
                cells,
                dot_pitch: None,
            };
        };

        let (top, bottom) = if self.is_full() {
            (self.top, self.bottom)
        } else {
            let top = band_top(&self, pitch, anchors, config.line_pitch_ratio);
            (top, self.bottom.max(top + 2.0 * pitch))
        };
        let spans = column_spans(&self.bounds, pitch, config.cell_pitch_ratio);
        let cells = self
            .clusters
            .into_iter()
            .zip(spans)
            .map(|(points, (left, right))| CellRegion::new(points, CellBBox::new(left, top, right, bottom)))
            .collect();
        Row {
            cells,
            dot_pitch: Some(pitch),
        }
    }
}

/// Top of a short row's band.
///
/// A short row is missing its top or bottom dot row, so its band starts
/// zero to two pitches above its highest dot. The candidate whose offset
/// from the nearest full-height row is closest to a whole number of line
/// pitches wins, the unshifted one on ties. With no full-height row on the
/// page the band starts at the highest dot.
fn band_top(row: &RowLayout, pitch: f32, anchors: &[f32], line_pitch_ratio: f32) -> f32 {
    let Some(anchor) = anchors
        .iter()
        .copied()
        .min_by(|a, b| (a - row.top).abs().total_cmp(&(b - row.top).abs()))
    else {
        return row.top;
    };
    let line_pitch = line_pitch(anchors, pitch * line_pitch_ratio);
    let height = row.bottom - row.top;
    let max_shift = ((2.0 * pitch - height) / pitch + 0.25).floor().clamp(0.0, 2.0) as usize;
    let misfit = |top: f32| {
        let d = top - anchor;
        (d - line_pitch * (d / line_pitch).round()).abs()
    };
    (0..=max_shift)
        .map(|k| row.top - k as f32 * pitch)
        .min_by(|a, b| misfit(*a).total_cmp(&misfit(*b)))
        .unwrap_or(row.top)
}

/// Line pitch from the closest pair of full-height rows, divided down to
/// the nearest multiple of `nominal` so a short line between them does not
/// double it. `nominal` when fewer than two rows are available.
fn line_pitch(anchors: &[f32], nominal: f32) -> f32 {
    let step = anchors
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f32::INFINITY, f32::min);
    if !step.is_finite() || step < MIN_EXTENT {
        return nominal;
    }
    step / (step / nominal).round().max(1.0)
}

/// Dot pitch of a row: median width of two-column cells, else the
/// configured nominal pitch, else half the row height.
fn row_dot_pitch(bounds: &[CellBBox], row_height: f32, config: &ClusterConfig) -> Option<f32> {
    let from_height = (row_height >= MIN_EXTENT).then_some(row_height / 2.0);
    let reference = config.nominal_dot_pitch.or(from_height);
    let cut = reference.map_or(MIN_EXTENT, |r| 0.5 * r);
    let mut wide: Vec<f32> = bounds
        .iter()
        .map(CellBBox::width)
        .filter(|&w| w > cut)
        .collect();
    median(&mut wide)
        .or(config.nominal_dot_pitch)
        .or(from_height)
        .filter(|&p| p >= MIN_EXTENT)
}

/// Horizontal extent of each cell's grid frame.
///
/// Single-column cells are placed in the left or right column by their
/// distance to the neighbouring cells: a right-column dot sits one dot pitch
/// closer to the next cell than a left-column dot would.
fn column_spans(bounds: &[CellBBox], pitch: f32, cell_pitch_ratio: f32) -> Vec<(f32, f32)> {
    let is_wide = |b: &CellBBox| b.width() >= 0.5 * pitch;
    let mut steps: Vec<f32> = bounds
        .windows(2)
        .filter(|w| is_wide(&w[0]) && is_wide(&w[1]))
        .map(|w| w[1].left - w[0].left)
        .filter(|&step| step < pitch * (cell_pitch_ratio + 1.0))
        .collect();
    let cell_pitch = median(&mut steps).unwrap_or(pitch * cell_pitch_ratio);
    let split = cell_pitch - 0.5 * pitch;
    let window = cell_pitch + 0.5 * pitch;

    let mut spans: Vec<(f32, f32)> = Vec::with_capacity(bounds.len());
    for (i, b) in bounds.iter().enumerate() {
        if is_wide(b) {
            spans.push((b.left, b.right));
            continue;
        }
        let x = b.left;
        let mut right_column = None;
        if let Some(next) = bounds.get(i + 1) {
            let d = next.left - x;
            if d <= window {
                right_column = Some(d < split);
            }
        }
        if right_column.is_none() {
            if let Some(&(_, prev_right)) = spans.last() {
                let d = x - prev_right;
                if d <= window {
                    right_column = Some(d > split);
                }
            }
        }
        if right_column == Some(true) {
            spans.push((x - pitch, x));
        } else {
            spans.push((x, x + pitch));
        }
    }
    spans
}
