//! Cell decoding modules
//!
//! Everything that happens after a cell has been located:
//! - Mask estimation (point binning, disk sampling, grid, components)
//! - Weighted voting with rescan and nearest-code fallbacks
//! - Symbol lookup and text assembly with shift codes

use serde::Serialize;
use thiserror::Error;

/// Shift-code state machine and spacing
pub mod assembler;
/// Tuning knobs and environment overrides
pub mod config;
/// Mask estimator strategies and the estimator panel
pub mod estimators;
/// Cell mask to symbol lookup
pub mod symbols;
/// Consensus over estimates
pub mod vote;

/// Why a cell produced no mask. Local to the cell, never fatal for a frame.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellError {
    /// Empty cluster, or a frame with no area inside the raster
    #[error("degenerate cell geometry")]
    DegenerateGeometry,
    /// Every estimator and fallback came back empty
    #[error("no estimator produced a mask")]
    NoEstimatesAvailable,
}
