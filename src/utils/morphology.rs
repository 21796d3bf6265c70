//! 3x3 binary morphology on [`BitMatrix`].
//!
//! Pixels outside the matrix count as background, so erosion eats into
//! blobs touching the border.

use crate::models::BitMatrix;

fn neighbourhood(matrix: &BitMatrix, x: usize, y: usize) -> impl Iterator<Item = bool> + '_ {
    (-1i64..=1).flat_map(move |dy| {
        (-1i64..=1).map(move |dx| {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            nx >= 0 && ny >= 0 && matrix.get(nx as usize, ny as usize)
        })
    })
}

/// Keep a pixel only if its whole 3x3 neighbourhood is lit
pub fn erode(matrix: &BitMatrix) -> BitMatrix {
    let mut out = BitMatrix::new(matrix.width(), matrix.height());
    for y in 0..matrix.height() {
        for x in 0..matrix.width() {
            if matrix.get(x, y) && neighbourhood(matrix, x, y).all(|lit| lit) {
                out.set(x, y, true);
            }
        }
    }
    out
}

/// Light a pixel if any pixel of its 3x3 neighbourhood is lit
pub fn dilate(matrix: &BitMatrix) -> BitMatrix {
    let mut out = BitMatrix::new(matrix.width(), matrix.height());
    for y in 0..matrix.height() {
        for x in 0..matrix.width() {
            if neighbourhood(matrix, x, y).any(|lit| lit) {
                out.set(x, y, true);
            }
        }
    }
    out
}

/// Erosion followed by dilation: removes specks and thin bridges
pub fn open(matrix: &BitMatrix) -> BitMatrix {
    dilate(&erode(matrix))
}
