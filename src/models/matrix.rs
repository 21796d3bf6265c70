/// Compact bit matrix for binary rasters (`true` = lit foreground)
#[derive(Debug, Clone)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// First column
    pub x0: usize,
    /// First row
    pub y0: usize,
    /// One past the last column
    pub x1: usize,
    /// One past the last row
    pub y1: usize,
}

impl PixelRect {
    /// Width in pixels
    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    /// Number of pixels covered
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }
}

impl BitMatrix {
    /// Create a new bit matrix with given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        let bytes_needed = (width * height).div_ceil(8);
        Self {
            width,
            height,
            data: vec![0; bytes_needed],
        }
    }

    /// Build a matrix from 8-bit luminance, marking pixels `>= threshold` as lit.
    ///
    /// With `invert` the comparison flips, for dark-on-light rasters.
    pub fn from_luma(luma: &[u8], width: usize, height: usize, threshold: u8, invert: bool) -> Self {
        let mut matrix = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let Some(&v) = luma.get(y * width + x) else {
                    continue;
                };
                matrix.set(x, y, (v >= threshold) != invert);
            }
        }
        matrix
    }

    /// Get matrix width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get matrix height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get bit at (x, y)
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y * self.width + x;
        let byte_index = index / 8;
        let bit_index = index % 8;
        (self.data[byte_index] >> bit_index) & 1 == 1
    }

    /// Set bit at (x, y)
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        let byte_index = index / 8;
        let bit_index = index % 8;
        if value {
            self.data[byte_index] |= 1 << bit_index;
        } else {
            self.data[byte_index] &= !(1 << bit_index);
        }
    }

    /// Count lit pixels inside `rect` (clipped to the matrix)
    pub fn count_lit(&self, rect: PixelRect) -> usize {
        let x1 = rect.x1.min(self.width);
        let y1 = rect.y1.min(self.height);
        let mut count = 0;
        for y in rect.y0..y1 {
            for x in rect.x0..x1 {
                if self.get(x, y) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Fraction of lit pixels inside `rect`; 0.0 for an empty rectangle
    pub fn lit_fraction(&self, rect: PixelRect) -> f32 {
        let area = rect.area();
        if area == 0 {
            return 0.0;
        }
        self.count_lit(rect) as f32 / area as f32
    }

    /// Copy a sub-rectangle into a new matrix whose origin is `(rect.x0, rect.y0)`
    pub fn crop(&self, rect: PixelRect) -> BitMatrix {
        let x1 = rect.x1.min(self.width);
        let y1 = rect.y1.min(self.height);
        let mut out = BitMatrix::new(x1.saturating_sub(rect.x0), y1.saturating_sub(rect.y0));
        for y in rect.y0..y1 {
            for x in rect.x0..x1 {
                if self.get(x, y) {
                    out.set(x - rect.x0, y - rect.y0, true);
                }
            }
        }
        out
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_matrix() {
        let mut matrix = BitMatrix::new(8, 8);
        assert_eq!(matrix.width(), 8);
        assert_eq!(matrix.height(), 8);

        matrix.set(3, 4, true);
        assert!(matrix.get(3, 4));
        assert!(!matrix.get(3, 3));

        matrix.set(3, 4, false);
        assert!(!matrix.get(3, 4));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut matrix = BitMatrix::new(8, 8);
        matrix.set(10, 10, true); // Should not panic
        assert!(!matrix.get(10, 10));
    }

    #[test]
    fn test_lit_fraction_and_crop() {
        let mut matrix = BitMatrix::new(10, 10);
        for y in 2..4 {
            for x in 2..4 {
                matrix.set(x, y, true);
            }
        }
        let rect = PixelRect { x0: 2, y0: 2, x1: 6, y1: 4 };
        assert_eq!(matrix.count_lit(rect), 4);
        assert!((matrix.lit_fraction(rect) - 0.5).abs() < 1e-6);

        let empty = PixelRect { x0: 5, y0: 5, x1: 5, y1: 9 };
        assert_eq!(matrix.lit_fraction(empty), 0.0);

        let cropped = matrix.crop(rect);
        assert_eq!((cropped.width(), cropped.height()), (4, 2));
        assert!(cropped.get(0, 0));
        assert!(cropped.get(1, 1));
        assert!(!cropped.get(2, 0));
    }

    #[test]
    fn test_from_luma() {
        let luma = [0u8, 255, 200, 10];
        let lit = BitMatrix::from_luma(&luma, 2, 2, 128, false);
        assert!(!lit.get(0, 0));
        assert!(lit.get(1, 0));
        assert!(lit.get(0, 1));

        let inverted = BitMatrix::from_luma(&luma, 2, 2, 128, true);
        assert!(inverted.get(0, 0));
        assert!(inverted.get(1, 1));
        assert!(!inverted.get(1, 0));
    }
}
