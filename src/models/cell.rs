//! Cell-level data: the six-dot mask, bounding boxes and grid frames.
//!
//! Bit convention (column-major): bit `i` holds Braille dot `i + 1`, so the
//! bit index of a position is `column * 3 + row`, with column 0 on the left
//! and row 0 at the top.
//!
//! ```text
//!   dot 1 (bit 0)  o o  dot 4 (bit 3)
//!   dot 2 (bit 1)  o o  dot 5 (bit 4)
//!   dot 3 (bit 2)  o o  dot 6 (bit 5)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{PixelRect, Point};

/// Six-bit dot pattern of one Braille cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellMask(u8);

impl CellMask {
    /// Mask with no raised dots
    pub const EMPTY: CellMask = CellMask(0);
    /// Mask with all six dots raised
    pub const FULL: CellMask = CellMask(0b11_1111);

    /// Build from raw bits; bits above the sixth are dropped
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b11_1111)
    }

    /// Build from Braille dot numbers (1..=6). Out-of-range numbers are ignored.
    pub const fn from_dots(dots: &[u8]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < dots.len() {
            let d = dots[i];
            if d >= 1 && d <= 6 {
                bits |= 1 << (d - 1);
            }
            i += 1;
        }
        Self(bits)
    }

    /// Bit index for a grid position
    pub const fn bit_index(column: usize, row: usize) -> usize {
        column * 3 + row
    }

    /// Raw bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when no dot is raised
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether Braille dot `dot` (1..=6) is raised
    pub fn has_dot(self, dot: u8) -> bool {
        (1..=6).contains(&dot) && self.0 & (1 << (dot - 1)) != 0
    }

    /// Whether the position at (`column`, `row`) is raised
    pub fn has_position(self, column: usize, row: usize) -> bool {
        column < 2 && row < 3 && self.0 & (1 << Self::bit_index(column, row)) != 0
    }

    /// Copy with the position at (`column`, `row`) raised
    pub fn with_position(self, column: usize, row: usize) -> Self {
        if column >= 2 || row >= 3 {
            return self;
        }
        Self(self.0 | 1 << Self::bit_index(column, row))
    }

    /// Raised dot numbers in ascending order
    pub fn dots(self) -> impl Iterator<Item = u8> {
        (1..=6u8).filter(move |&d| self.has_dot(d))
    }

    /// Number of differing dots
    pub fn hamming(self, other: CellMask) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl std::ops::BitOr for CellMask {
    type Output = CellMask;

    fn bitor(self, rhs: CellMask) -> CellMask {
        CellMask(self.0 | rhs.0)
    }
}

impl fmt::Display for CellMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }
        for d in self.dots() {
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Axis-aligned box in pixel coordinates. Zero width or height is degenerate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CellBBox {
    /// Left edge
    pub left: f32,
    /// Top edge
    pub top: f32,
    /// Right edge
    pub right: f32,
    /// Bottom edge
    pub bottom: f32,
}

impl CellBBox {
    /// Create a box from its edges
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Tight box around `points`, or `None` when empty
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            bbox.left = bbox.left.min(p.x);
            bbox.top = bbox.top.min(p.y);
            bbox.right = bbox.right.max(p.x);
            bbox.bottom = bbox.bottom.max(p.y);
        }
        Some(bbox)
    }

    /// Width
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Height
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// True when the box has no area
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Grow every side by `fraction` of the smaller dimension
    pub fn padded(&self, fraction: f32) -> Self {
        let pad = fraction * self.width().min(self.height()).max(0.0);
        Self::new(
            self.left - pad,
            self.top - pad,
            self.right + pad,
            self.bottom + pad,
        )
    }

    /// Pixels covered by the box, clamped to a `width x height` raster.
    ///
    /// Returns `None` when the clamped region is empty.
    pub fn to_pixel_rect(&self, width: usize, height: usize) -> Option<PixelRect> {
        if self.is_degenerate() || width == 0 || height == 0 {
            return None;
        }
        let clamp = |v: f32, max: usize| -> usize {
            if v <= 0.0 {
                0
            } else {
                (v as usize).min(max)
            }
        };
        let rect = PixelRect {
            x0: clamp(self.left.floor(), width),
            y0: clamp(self.top.floor(), height),
            x1: clamp(self.right.floor() + 1.0, width),
            y1: clamp(self.bottom.floor() + 1.0, height),
        };
        (rect.area() > 0).then_some(rect)
    }

    /// Nominal center of a dot position when this box is a grid frame
    pub fn dot_center(&self, column: usize, row: usize) -> Point {
        Point::new(
            self.left + column as f32 * self.width(),
            self.top + row as f32 * self.height() / 2.0,
        )
    }

    /// Grid position of `p` inside this frame: two columns split at the
    /// middle, three equal row bands. Points outside are clamped in.
    pub fn classify(&self, p: &Point) -> (usize, usize) {
        let dx = p.x - self.left;
        let dy = p.y - self.top;
        let w = self.width();
        let h = self.height();
        let column = if dx < w / 2.0 { 0 } else { 1 };
        let row = if dy < h / 3.0 {
            0
        } else if dy < 2.0 * h / 3.0 {
            1
        } else {
            2
        };
        (column, row)
    }
}

/// A cell's dot cluster together with its grid frame
#[derive(Debug, Clone, PartialEq)]
pub struct CellRegion {
    /// Points ordered by y, then x
    pub points: Vec<Point>,
    /// Box in which the six dot centers sit
    pub frame: CellBBox,
}

impl CellRegion {
    /// Create a region; points are re-sorted by y then x
    pub fn new(mut points: Vec<Point>, frame: CellBBox) -> Self {
        points.sort_by(|a, b| a.cmp_yx(b));
        Self { points, frame }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_bit_convention() {
        assert_eq!(CellMask::from_dots(&[1]).bits(), 0b000001);
        assert_eq!(CellMask::from_dots(&[4]).bits(), 0b001000);
        assert_eq!(CellMask::from_dots(&[6]).bits(), 0b100000);
        assert_eq!(CellMask::from_dots(&[3, 4, 5, 6]).bits(), 0b111100);
        assert!(CellMask::from_dots(&[2]).has_position(0, 1));
        assert!(CellMask::from_dots(&[5]).has_position(1, 1));
        assert_eq!(CellMask::EMPTY.with_position(1, 2), CellMask::from_dots(&[6]));
        assert_eq!(CellMask::from_dots(&[1, 2, 5]).to_string(), "125");
        assert_eq!(CellMask::from_bits(0xFF), CellMask::FULL);
    }

    #[test]
    fn test_hamming() {
        let a = CellMask::from_dots(&[1]);
        let q = CellMask::from_dots(&[1, 2, 3, 4, 5]);
        assert_eq!(a.hamming(q), 4);
        assert_eq!(q.hamming(CellMask::FULL), 1);
        assert_eq!((a | q), q);
    }

    #[test]
    fn test_bbox_padding_and_pixels() {
        let bbox = CellBBox::new(10.0, 10.0, 22.0, 34.0);
        let padded = bbox.padded(0.25);
        assert_eq!(padded, CellBBox::new(7.0, 7.0, 25.0, 37.0));

        let rect = padded.to_pixel_rect(100, 100).unwrap();
        assert_eq!((rect.x0, rect.y0, rect.x1, rect.y1), (7, 7, 26, 38));

        let clipped = padded.to_pixel_rect(20, 20).unwrap();
        assert_eq!((clipped.x1, clipped.y1), (20, 20));

        let outside = CellBBox::new(50.0, 50.0, 60.0, 60.0);
        assert!(outside.to_pixel_rect(20, 20).is_none());
    }

    #[test]
    fn test_degenerate_bbox() {
        let single = CellBBox::from_points(&[Point::new(3.0, 4.0)]).unwrap();
        assert!(single.is_degenerate());
        assert!(single.padded(0.25).is_degenerate());
        assert!(single.to_pixel_rect(10, 10).is_none());
        assert!(CellBBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_classify_positions() {
        let frame = CellBBox::new(0.0, 0.0, 12.0, 24.0);
        for column in 0..2 {
            for row in 0..3 {
                let c = frame.dot_center(column, row);
                assert_eq!(frame.classify(&c), (column, row));
            }
        }
        assert_eq!(frame.classify(&Point::new(-3.0, 30.0)), (0, 2));
    }
}
