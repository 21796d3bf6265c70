//! Raster helpers
//!
//! - Morphology (3x3 erode, dilate and open on binary rasters)

pub mod morphology;
