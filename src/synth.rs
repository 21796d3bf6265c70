//! Synthetic Braille frames for tests, benchmarks and tool smoke runs.
//!
//! Lays out text as dot centers on a regular grid and renders them as
//! filled disks into a [`BitMatrix`], standing in for the imaging front end.

use crate::decoder::symbols::{CAPITAL_SIGN, NUMBER_SIGN, SymbolTable};
use crate::models::{BitMatrix, CellMask, Point};

/// Geometry of a synthetic page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthLayout {
    /// Center of dot 1 of the first cell
    pub origin: Point,
    /// Distance between neighbouring dots of a cell
    pub dot_pitch: f32,
    /// Distance between the left columns of consecutive cells
    pub cell_pitch: f32,
    /// Distance between the top rows of consecutive lines
    pub line_pitch: f32,
    /// Radius of rendered dots
    pub dot_radius: f32,
}

impl Default for SynthLayout {
    fn default() -> Self {
        Self {
            origin: Point::new(20.0, 20.0),
            dot_pitch: 12.0,
            cell_pitch: 31.0,
            line_pitch: 60.0,
            dot_radius: 3.5,
        }
    }
}

/// Points plus their rendered raster
#[derive(Debug, Clone)]
pub struct SynthFrame {
    /// Dot centers
    pub points: Vec<Point>,
    /// Rendered binary raster
    pub raster: BitMatrix,
}

/// Cell sequence for `text`: `None` is a blank cell.
///
/// Uppercase letters get a capital sign, digit runs a leading number sign.
/// Characters without a cell are dropped.
pub fn cells_for_text(table: &SymbolTable, text: &str) -> Vec<Option<CellMask>> {
    let mut cells = Vec::new();
    let mut in_number = false;
    for c in text.chars() {
        if c == ' ' {
            cells.push(None);
            in_number = false;
            continue;
        }
        let Some(mask) = table.mask_for(c) else {
            continue;
        };
        if c.is_ascii_digit() {
            if !in_number {
                cells.push(Some(NUMBER_SIGN));
                in_number = true;
            }
        } else {
            in_number = false;
            if c.is_ascii_uppercase() {
                cells.push(Some(CAPITAL_SIGN));
            }
        }
        cells.push(Some(mask));
    }
    cells
}

impl SynthLayout {
    /// Dot centers of one cell placed at `line`, `slot`
    pub fn cell_points(&self, mask: CellMask, line: usize, slot: usize) -> Vec<Point> {
        let x0 = self.origin.x + slot as f32 * self.cell_pitch;
        let y0 = self.origin.y + line as f32 * self.line_pitch;
        let mut points = Vec::new();
        for column in 0..2 {
            for row in 0..3 {
                if mask.has_position(column, row) {
                    points.push(Point::new(
                        x0 + column as f32 * self.dot_pitch,
                        y0 + row as f32 * self.dot_pitch,
                    ));
                }
            }
        }
        points
    }

    /// Dot centers for several lines of cells
    pub fn dot_points(&self, lines: &[Vec<Option<CellMask>>]) -> Vec<Point> {
        let mut points = Vec::new();
        for (line, cells) in lines.iter().enumerate() {
            for (slot, cell) in cells.iter().enumerate() {
                if let Some(mask) = cell {
                    points.extend(self.cell_points(*mask, line, slot));
                }
            }
        }
        points
    }

    /// Render dots as filled disks on a raster of the given size
    pub fn render(&self, points: &[Point], width: usize, height: usize) -> BitMatrix {
        let mut raster = BitMatrix::new(width, height);
        let r = self.dot_radius;
        let r2 = r * r;
        for p in points {
            let x_lo = (p.x - r).floor().max(0.0) as usize;
            let y_lo = (p.y - r).floor().max(0.0) as usize;
            let x_hi = ((p.x + r).ceil().max(0.0) as usize).min(width.saturating_sub(1));
            let y_hi = ((p.y + r).ceil().max(0.0) as usize).min(height.saturating_sub(1));
            for y in y_lo..=y_hi {
                for x in x_lo..=x_hi {
                    let dx = x as f32 - p.x;
                    let dy = y as f32 - p.y;
                    if dx * dx + dy * dy <= r2 {
                        raster.set(x, y, true);
                    }
                }
            }
        }
        raster
    }

    /// Lay out `lines` of text and render them on a raster sized to fit
    pub fn frame(&self, table: &SymbolTable, lines: &[&str]) -> SynthFrame {
        let cells: Vec<Vec<Option<CellMask>>> =
            lines.iter().map(|l| cells_for_text(table, l)).collect();
        let points = self.dot_points(&cells);
        let slots = cells.iter().map(Vec::len).max().unwrap_or(0);
        let width = (2.0 * self.origin.x + slots as f32 * self.cell_pitch).ceil() as usize;
        let height = (2.0 * self.origin.y + lines.len() as f32 * self.line_pitch).ceil() as usize;
        let raster = self.render(&points, width, height);
        SynthFrame { points, raster }
    }
}
