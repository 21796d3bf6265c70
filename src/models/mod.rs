/// Cell masks, bounding boxes and grid frames
pub mod cell;
/// Packed binary rasters
pub mod matrix;
/// Pixel-space points
pub mod point;

pub use cell::{CellBBox, CellMask, CellRegion};
pub use matrix::{BitMatrix, PixelRect};
pub use point::Point;
