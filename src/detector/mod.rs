//! Dot grouping modules
//!
//! Turns a frame's loose dot detections into cells:
//! - Row and cell clustering with per-frame adaptive thresholds
//! - Connected components for raster-based dot detection

/// Row and cell clustering of dot centers
pub mod clustering;
/// 8-connected component labeling on binary rasters
pub mod connected_components;
