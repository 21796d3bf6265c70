//! Connected components of lit pixels, used to find individual dots in a cell crop.
//! Labels with 8-connectivity and reports area, centroid and bounds per blob.
use crate::models::{BitMatrix, Point};

/// Union-Find over provisional labels
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
        }
    }

    fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        // Path compression
        let mut cur = x;
        while self.parent[cur as usize] != root {
            let next = self.parent[cur as usize];
            self.parent[cur as usize] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, x: u32, y: u32) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x != root_y {
            // Smaller root wins so labels stay in scan order
            let (lo, hi) = if root_x < root_y {
                (root_x, root_y)
            } else {
                (root_y, root_x)
            };
            self.parent[hi as usize] = lo;
        }
    }
}

/// One 8-connected blob of lit pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Component {
    /// Pixel count
    pub area: usize,
    /// Mean pixel position (pixel centers at integer coordinates)
    pub centroid: Point,
    /// Inclusive bounds (x0, y0, x1, y1)
    pub bounds: (usize, usize, usize, usize),
}

#[derive(Default)]
struct Accumulator {
    area: usize,
    sum_x: f64,
    sum_y: f64,
    bounds: Option<(usize, usize, usize, usize)>,
}

/// Find connected lit regions, ordered by first pixel in raster scan order
pub fn find_components(matrix: &BitMatrix) -> Vec<Component> {
    let width = matrix.width();
    let height = matrix.height();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut labels = vec![0u32; width * height];
    // Label 0 is background; at most one new label per pixel.
    let mut uf = UnionFind::new(width * height + 1);
    let mut next_label = 1u32;

    // First pass: provisional labels
    for y in 0..height {
        for x in 0..width {
            if !matrix.get(x, y) {
                continue;
            }

            let mut neighbors = [0u32; 4];
            let mut count = 0;
            let mut push = |label: u32| {
                if label != 0 {
                    neighbors[count] = label;
                    count += 1;
                }
            };
            if x > 0 {
                push(labels[y * width + x - 1]);
            }
            if y > 0 {
                push(labels[(y - 1) * width + x]);
                if x > 0 {
                    push(labels[(y - 1) * width + x - 1]);
                }
                if x + 1 < width {
                    push(labels[(y - 1) * width + x + 1]);
                }
            }

            let idx = y * width + x;
            match neighbors[..count].iter().min() {
                None => {
                    labels[idx] = next_label;
                    next_label += 1;
                }
                Some(&min_label) => {
                    labels[idx] = min_label;
                    for &l in &neighbors[..count] {
                        uf.union(min_label, l);
                    }
                }
            }
        }
    }

    // Second pass: accumulate statistics per root
    let mut stats: Vec<Accumulator> = Vec::new();
    let mut slot_of_root = vec![usize::MAX; next_label as usize];
    for y in 0..height {
        for x in 0..width {
            let label = labels[y * width + x];
            if label == 0 {
                continue;
            }
            let root = uf.find(label) as usize;
            if slot_of_root[root] == usize::MAX {
                slot_of_root[root] = stats.len();
                stats.push(Accumulator::default());
            }
            let acc = &mut stats[slot_of_root[root]];
            acc.area += 1;
            acc.sum_x += x as f64;
            acc.sum_y += y as f64;
            let b = acc.bounds.get_or_insert((x, y, x, y));
            b.0 = b.0.min(x);
            b.1 = b.1.min(y);
            b.2 = b.2.max(x);
            b.3 = b.3.max(y);
        }
    }

    stats
        .into_iter()
        .filter_map(|acc| {
            let bounds = acc.bounds?;
            let n = acc.area as f64;
            Some(Component {
                area: acc.area,
                centroid: Point::new((acc.sum_x / n) as f32, (acc.sum_y / n) as f32),
                bounds,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_square() {
        let mut matrix = BitMatrix::new(10, 10);
        // 2x2 square at (2,2)
        matrix.set(2, 2, true);
        matrix.set(3, 2, true);
        matrix.set(2, 3, true);
        matrix.set(3, 3, true);

        let components = find_components(&matrix);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].area, 4);
        assert_eq!(components[0].bounds, (2, 2, 3, 3));
        assert_eq!(components[0].centroid, Point::new(2.5, 2.5));
    }

    #[test]
    fn test_diagonal_pixels_join() {
        let mut matrix = BitMatrix::new(6, 6);
        matrix.set(1, 1, true);
        matrix.set(2, 2, true);
        matrix.set(3, 1, true);
        matrix.set(5, 5, true);

        let components = find_components(&matrix);
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].area, 3);
        assert_eq!(components[0].bounds, (1, 1, 3, 2));
        assert_eq!(components[1].area, 1);
    }

    #[test]
    fn test_u_shape_merges_labels() {
        // Two arms that only meet at the bottom row
        let mut matrix = BitMatrix::new(5, 4);
        for y in 0..4 {
            matrix.set(0, y, true);
            matrix.set(4, y, true);
        }
        for x in 0..5 {
            matrix.set(x, 3, true);
        }
        let components = find_components(&matrix);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].area, 11);
    }

    #[test]
    fn test_empty_matrix() {
        assert!(find_components(&BitMatrix::new(4, 4)).is_empty());
        assert!(find_components(&BitMatrix::new(0, 0)).is_empty());
    }
}
