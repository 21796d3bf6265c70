use serde::Serialize;
use tracing::debug;

use crate::decoder::CellError;
use crate::decoder::assembler::{CellToken, TextAssembler};
use crate::decoder::config::DecoderConfig;
use crate::decoder::estimators::{Estimate, EstimatorPanel, GridEstimator, MaskEstimator};
use crate::decoder::symbols::SymbolTable;
use crate::decoder::vote::{MaskVoter, Vote};
use crate::detector::clustering::cluster_points;
use crate::models::{BitMatrix, CellBBox, CellRegion, Point};

/// Everything needed to decode a frame. Shared read-only across frames.
#[derive(Debug)]
pub struct Decoder {
    /// Tuning knobs
    pub config: DecoderConfig,
    /// Mask lookup
    pub table: SymbolTable,
    /// Registered estimators
    pub panel: EstimatorPanel,
}

impl Decoder {
    /// Standard table and estimator panel for `config`
    pub fn new(config: DecoderConfig) -> Self {
        let panel = EstimatorPanel::standard(&config.estimators);
        Self {
            config,
            table: SymbolTable::standard(),
            panel,
        }
    }

    /// Replace the estimator panel
    pub fn with_panel(mut self, panel: EstimatorPanel) -> Self {
        self.panel = panel;
        self
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

/// Per-cell debug record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellTrace {
    /// Row index within the frame
    pub row: usize,
    /// Cell index within the row
    pub index: usize,
    /// Grid frame
    pub frame: CellBBox,
    /// Number of dot detections in the cell
    pub points: usize,
    /// Individual estimator outputs
    pub estimates: Vec<Estimate>,
    /// Voting outcome
    pub vote: Option<Vote>,
    /// Why the cell contributed nothing
    pub error: Option<CellError>,
}

/// Result of decoding one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    /// Assembled text before stabilization
    pub line: String,
    /// Number of rows found
    pub rows: usize,
    /// Number of cells found
    pub cell_count: usize,
    /// Per-cell traces, when collection is on
    pub cells: Vec<CellTrace>,
}

struct DecodedCell {
    estimates: Vec<Estimate>,
    vote: Result<Vote, CellError>,
}

fn decode_cell(
    decoder: &Decoder,
    voter: &MaskVoter<'_>,
    rescan: &GridEstimator,
    cell: &CellRegion,
    raster: Option<&BitMatrix>,
) -> DecodedCell {
    let estimates = match decoder.panel.run(cell, raster) {
        Ok(estimates) => estimates,
        Err(e) => {
            return DecodedCell {
                estimates: Vec::new(),
                vote: Err(e),
            };
        }
    };
    let vote = voter.vote_with_fallback(
        &estimates,
        || rescan.estimate(cell, raster),
        || match raster {
            Some(_) => decoder.panel.run_geometric(cell),
            None => Vec::new(),
        },
    );
    if vote.mask.is_none() {
        debug!(frame = ?cell.frame, "no estimates for cell");
    }
    DecodedCell { estimates, vote: Ok(vote) }
}

/// Decode one frame: cluster, estimate, vote and assemble.
///
/// Never fails; cells that cannot be read contribute nothing to the line.
pub fn decode_frame(points: &[Point], raster: Option<&BitMatrix>, decoder: &Decoder) -> FrameReport {
    let config = &decoder.config;
    let collect = config.collect_traces || crate::debug::debug_enabled();
    let voter = MaskVoter::new(&decoder.table, &config.vote);
    let rescan = GridEstimator::from_config(&config.estimators).scaled(config.vote.rescan_factor);
    let assembler = TextAssembler::new(&decoder.table, &config.assembly);

    let rows = cluster_points(points, &config.cluster);
    let mut traces = Vec::new();
    let mut token_rows = Vec::with_capacity(rows.len());
    let mut cell_count = 0;

    for (row_idx, row) in rows.iter().enumerate() {
        let mut tokens = Vec::with_capacity(row.cells.len());
        for (idx, cell) in row.cells.iter().enumerate() {
            let decoded = decode_cell(decoder, &voter, &rescan, cell, raster);
            let mask = decoded.vote.as_ref().ok().and_then(|v| v.mask);
            tokens.push(CellToken::new(mask, &cell.frame));
            cell_count += 1;

            if collect {
                let (vote, error) = match decoded.vote {
                    Ok(vote) => (Some(vote), vote.mask().err()),
                    Err(e) => (None, Some(e)),
                };
                traces.push(CellTrace {
                    row: row_idx,
                    index: idx,
                    frame: cell.frame,
                    points: cell.points.len(),
                    estimates: decoded.estimates,
                    vote,
                    error,
                });
            }
        }
        token_rows.push(tokens);
    }

    FrameReport {
        line: assembler.assemble(&token_rows),
        rows: rows.len(),
        cell_count,
        cells: traces,
    }
}
