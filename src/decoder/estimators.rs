//! Per-cell mask estimators.
//!
//! Each estimator reads one cell, either from its dot points or from the
//! binary raster under its grid frame, and proposes a [`CellMask`]. They
//! fail in different ways under uneven lighting or partly occluded dots,
//! which is what the voter relies on.

use serde::Serialize;
use tracing::debug;

use super::CellError;
use super::config::EstimatorConfig;
use crate::detector::connected_components::find_components;
use crate::models::{BitMatrix, CellMask, CellRegion, PixelRect, Point};
use crate::utils::morphology;

/// A strategy that turns one cell into a mask estimate
pub trait MaskEstimator: Send + Sync {
    /// Short identifier used in traces
    fn name(&self) -> &'static str;

    /// Whether this estimator reads the raster
    fn needs_raster(&self) -> bool;

    /// Estimate the cell's mask; `None` when nothing usable was found
    fn estimate(&self, cell: &CellRegion, raster: Option<&BitMatrix>) -> Option<CellMask>;
}

/// Pixels under a cell's padded frame.
///
/// Fails with [`CellError::DegenerateGeometry`] when the frame or its
/// clamped padded box has no area.
pub fn padded_window(
    cell: &CellRegion,
    raster: &BitMatrix,
    padding: f32,
) -> Result<PixelRect, CellError> {
    if cell.frame.is_degenerate() {
        return Err(CellError::DegenerateGeometry);
    }
    cell.frame
        .padded(padding)
        .to_pixel_rect(raster.width(), raster.height())
        .ok_or(CellError::DegenerateGeometry)
}

fn mask_from_positions(positions: impl IntoIterator<Item = (usize, usize)>) -> Option<CellMask> {
    let mask = positions
        .into_iter()
        .fold(CellMask::EMPTY, |m, (column, row)| m.with_position(column, row));
    (!mask.is_empty()).then_some(mask)
}

/// Bins detected points into the six grid positions of the frame
#[derive(Debug, Clone, Copy, Default)]
pub struct PointCountEstimator;

impl MaskEstimator for PointCountEstimator {
    fn name(&self) -> &'static str {
        "point_count"
    }

    fn needs_raster(&self) -> bool {
        false
    }

    fn estimate(&self, cell: &CellRegion, _raster: Option<&BitMatrix>) -> Option<CellMask> {
        if cell.frame.is_degenerate() {
            return None;
        }
        mask_from_positions(cell.points.iter().map(|p| cell.frame.classify(p)))
    }
}

/// Lit fraction of a disk around each nominal dot center
#[derive(Debug, Clone, Copy)]
pub struct SamplingEstimator {
    /// Frame padding fraction
    pub padding: f32,
    /// Disk radius as a fraction of the frame's smaller side
    pub radius: f32,
    /// Lit fraction above which a position is on
    pub threshold: f32,
}

impl SamplingEstimator {
    /// Build from config
    pub fn from_config(config: &EstimatorConfig) -> Self {
        Self {
            padding: config.padding,
            radius: config.sample_radius,
            threshold: config.sampling_threshold,
        }
    }

    fn disk_fraction(raster: &BitMatrix, window: PixelRect, center: Point, radius: f32) -> f32 {
        let r2 = radius * radius;
        let x_lo = ((center.x - radius).floor().max(window.x0 as f32) as usize).max(window.x0);
        let y_lo = ((center.y - radius).floor().max(window.y0 as f32) as usize).max(window.y0);
        let x_hi = ((center.x + radius).ceil().max(0.0) as usize + 1).min(window.x1);
        let y_hi = ((center.y + radius).ceil().max(0.0) as usize + 1).min(window.y1);

        let mut total = 0usize;
        let mut lit = 0usize;
        for y in y_lo..y_hi {
            for x in x_lo..x_hi {
                let dx = x as f32 - center.x;
                let dy = y as f32 - center.y;
                if dx * dx + dy * dy <= r2 {
                    total += 1;
                    if raster.get(x, y) {
                        lit += 1;
                    }
                }
            }
        }
        if total == 0 {
            0.0
        } else {
            lit as f32 / total as f32
        }
    }
}

impl MaskEstimator for SamplingEstimator {
    fn name(&self) -> &'static str {
        "sampling"
    }

    fn needs_raster(&self) -> bool {
        true
    }

    fn estimate(&self, cell: &CellRegion, raster: Option<&BitMatrix>) -> Option<CellMask> {
        let raster = raster?;
        let window = padded_window(cell, raster, self.padding).ok()?;
        let frame = cell.frame;
        let radius = self.radius * frame.width().min(frame.height());
        let on = (0..2)
            .flat_map(|column| (0..3).map(move |row| (column, row)))
            .filter(|&(column, row)| {
                let center = frame.dot_center(column, row);
                Self::disk_fraction(raster, window, center, radius) > self.threshold
            });
        mask_from_positions(on)
    }
}

/// Lit fraction of a literal 2x3 partition of the padded frame
#[derive(Debug, Clone, Copy)]
pub struct GridEstimator {
    /// Frame padding fraction
    pub padding: f32,
    /// Lit fraction above which a position is on
    pub threshold: f32,
}

impl GridEstimator {
    /// Build from config
    pub fn from_config(config: &EstimatorConfig) -> Self {
        Self {
            padding: config.padding,
            threshold: config.grid_threshold,
        }
    }

    /// Same estimator with its threshold scaled by `factor`
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            threshold: self.threshold * factor,
            ..*self
        }
    }
}

impl MaskEstimator for GridEstimator {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn needs_raster(&self) -> bool {
        true
    }

    fn estimate(&self, cell: &CellRegion, raster: Option<&BitMatrix>) -> Option<CellMask> {
        let raster = raster?;
        let window = padded_window(cell, raster, self.padding).ok()?;
        let (w, h) = (window.width(), window.height());
        let on = (0..2)
            .flat_map(|column| (0..3).map(move |row| (column, row)))
            .filter(|&(column, row)| {
                let rect = PixelRect {
                    x0: window.x0 + w * column / 2,
                    y0: window.y0 + h * row / 3,
                    x1: window.x0 + w * (column + 1) / 2,
                    y1: window.y0 + h * (row + 1) / 3,
                };
                raster.lit_fraction(rect) > self.threshold
            });
        mask_from_positions(on)
    }
}

/// Bins the centroids of dot-sized connected components
#[derive(Debug, Clone, Copy)]
pub struct ComponentEstimator {
    /// Frame padding fraction
    pub padding: f32,
    /// Apply a 3x3 opening first
    pub opening: bool,
    /// Smallest accepted component area
    pub min_area: usize,
}

impl ComponentEstimator {
    /// Build from config
    pub fn from_config(config: &EstimatorConfig) -> Self {
        Self {
            padding: config.padding,
            opening: config.component_opening,
            min_area: config.component_min_area,
        }
    }
}

impl MaskEstimator for ComponentEstimator {
    fn name(&self) -> &'static str {
        "components"
    }

    fn needs_raster(&self) -> bool {
        true
    }

    fn estimate(&self, cell: &CellRegion, raster: Option<&BitMatrix>) -> Option<CellMask> {
        let raster = raster?;
        let window = padded_window(cell, raster, self.padding).ok()?;
        let mut crop = raster.crop(window);
        if self.opening {
            crop = morphology::open(&crop);
        }
        // A dot never covers more than one sixth of the cell.
        let max_area = window.area() / 6;
        let on = find_components(&crop)
            .into_iter()
            .filter(|c| c.area >= self.min_area && c.area <= max_area)
            .map(|c| {
                let centroid = c
                    .centroid
                    .translate(window.x0 as f32, window.y0 as f32);
                cell.frame.classify(&centroid)
            });
        mask_from_positions(on)
    }
}

/// One estimator's output for a cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    /// Estimator name
    pub estimator: &'static str,
    /// Vote weight
    pub weight: u32,
    /// Proposed mask
    pub mask: Option<CellMask>,
}

/// Registered estimators with their vote weights
pub struct EstimatorPanel {
    members: Vec<(Box<dyn MaskEstimator>, u32)>,
}

impl EstimatorPanel {
    /// Empty panel
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    /// Point-count, sampling, grid and component estimators with configured weights
    pub fn standard(config: &EstimatorConfig) -> Self {
        Self::new()
            .with(PointCountEstimator, config.point_count_weight)
            .with(SamplingEstimator::from_config(config), config.sampling_weight)
            .with(GridEstimator::from_config(config), config.grid_weight)
            .with(ComponentEstimator::from_config(config), config.component_weight)
    }

    /// Register an estimator
    pub fn with<E: MaskEstimator + 'static>(mut self, estimator: E, weight: u32) -> Self {
        self.members.push((Box::new(estimator), weight));
        self
    }

    /// Number of registered estimators
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Run the estimators that fit the input: raster estimators when a
    /// raster is given, geometric ones otherwise.
    pub fn run(
        &self,
        cell: &CellRegion,
        raster: Option<&BitMatrix>,
    ) -> Result<Vec<Estimate>, CellError> {
        if cell.points.is_empty() || cell.frame.is_degenerate() {
            debug!(frame = ?cell.frame, points = cell.points.len(), "degenerate cell");
            return Err(CellError::DegenerateGeometry);
        }
        if let Some(raster) = raster {
            padded_window(cell, raster, 0.0)?;
        }
        Ok(self.estimates(cell, raster))
    }

    /// Estimates from the estimators that read only the dot points.
    ///
    /// Used when the raster estimators come back empty for a cell whose
    /// points are present.
    pub fn run_geometric(&self, cell: &CellRegion) -> Vec<Estimate> {
        self.estimates(cell, None)
    }

    fn estimates(&self, cell: &CellRegion, raster: Option<&BitMatrix>) -> Vec<Estimate> {
        self.members
            .iter()
            .filter(|(e, _)| e.needs_raster() == raster.is_some())
            .map(|(e, weight)| Estimate {
                estimator: e.name(),
                weight: *weight,
                mask: e.estimate(cell, raster),
            })
            .collect()
    }
}

impl Default for EstimatorPanel {
    fn default() -> Self {
        Self::standard(&EstimatorConfig::default())
    }
}

impl std::fmt::Debug for EstimatorPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.members.iter().map(|(e, w)| (e.name(), w)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::symbols::SymbolTable;
    use crate::models::CellBBox;
    use crate::synth::SynthLayout;

    /// Cell at the default synthetic origin with a full-size frame
    fn synthetic_cell(mask: CellMask) -> (CellRegion, BitMatrix) {
        let layout = SynthLayout::default();
        let points = layout.cell_points(mask, 0, 0);
        let raster = layout.render(&points, 60, 70);
        let frame = CellBBox::new(20.0, 20.0, 32.0, 44.0);
        (CellRegion::new(points, frame), raster)
    }

    fn raster_estimators() -> Vec<Box<dyn MaskEstimator>> {
        let config = EstimatorConfig::default();
        vec![
            Box::new(SamplingEstimator::from_config(&config)),
            Box::new(GridEstimator::from_config(&config)),
            Box::new(ComponentEstimator::from_config(&config)),
        ]
    }

    #[test]
    fn test_point_count_round_trips_every_entry() {
        let table = SymbolTable::standard();
        for (mask, symbol) in table.entries() {
            let (cell, _) = synthetic_cell(mask);
            assert_eq!(
                PointCountEstimator.estimate(&cell, None),
                Some(mask),
                "{symbol:?}"
            );
        }
    }

    #[test]
    fn test_raster_estimators_round_trip_every_entry() {
        let table = SymbolTable::standard();
        for estimator in raster_estimators() {
            for (mask, symbol) in table.entries() {
                let (cell, raster) = synthetic_cell(mask);
                assert_eq!(
                    estimator.estimate(&cell, Some(&raster)),
                    Some(mask),
                    "{} on {symbol:?}",
                    estimator.name()
                );
            }
        }
    }

    #[test]
    fn test_raster_estimators_need_raster() {
        let (cell, _) = synthetic_cell(CellMask::from_dots(&[1, 2]));
        for estimator in raster_estimators() {
            assert!(estimator.needs_raster());
            assert_eq!(estimator.estimate(&cell, None), None);
        }
    }

    #[test]
    fn test_blank_raster_gives_no_estimate() {
        let (cell, _) = synthetic_cell(CellMask::from_dots(&[1]));
        let blank = BitMatrix::new(60, 70);
        for estimator in raster_estimators() {
            assert_eq!(estimator.estimate(&cell, Some(&blank)), None);
        }
    }

    #[test]
    fn test_component_estimator_ignores_specks() {
        let (cell, mut raster) = synthetic_cell(CellMask::from_dots(&[1]));
        // Isolated pixel at dot 6
        raster.set(32, 44, true);
        let estimator = ComponentEstimator::from_config(&EstimatorConfig::default());
        assert_eq!(
            estimator.estimate(&cell, Some(&raster)),
            Some(CellMask::from_dots(&[1]))
        );
    }

    #[test]
    fn test_grid_rescan_is_more_permissive() {
        let frame = CellBBox::new(20.0, 20.0, 32.0, 44.0);
        let cell = CellRegion::new(vec![Point::new(20.0, 20.0)], frame);
        let mut raster = BitMatrix::new(60, 70);
        // Padded window is 19x31; the top-left rectangle is 9x10 = 90 px.
        // 11 lit pixels give 0.122: below 0.13, above 0.117.
        for i in 0..11 {
            raster.set(17 + i % 9, 17 + i / 9, true);
        }
        let grid = GridEstimator {
            padding: 0.25,
            threshold: 0.13,
        };
        assert_eq!(grid.estimate(&cell, Some(&raster)), None);
        assert_eq!(
            grid.scaled(0.9).estimate(&cell, Some(&raster)),
            Some(CellMask::from_dots(&[1]))
        );
    }

    #[test]
    fn test_panel_picks_estimators_by_input() {
        let panel = EstimatorPanel::default();
        assert_eq!(panel.len(), 4);
        let (cell, raster) = synthetic_cell(CellMask::from_dots(&[1, 4]));

        let geometric = panel.run(&cell, None).unwrap();
        assert_eq!(geometric.len(), 1);
        assert_eq!(geometric[0].estimator, "point_count");

        let pixels = panel.run(&cell, Some(&raster)).unwrap();
        let names: Vec<_> = pixels.iter().map(|e| e.estimator).collect();
        assert_eq!(names, ["sampling", "grid", "components"]);
        assert_eq!(pixels[0].weight, 2);
        assert!(pixels.iter().all(|e| e.mask == Some(CellMask::from_dots(&[1, 4]))));
    }

    #[test]
    fn test_degenerate_cell_fails() {
        let panel = EstimatorPanel::default();
        let p = Point::new(5.0, 5.0);
        let cell = CellRegion::new(vec![p], CellBBox::new(5.0, 5.0, 5.0, 5.0));
        assert_eq!(panel.run(&cell, None), Err(CellError::DegenerateGeometry));

        // Frame entirely outside the raster
        let outside = CellRegion::new(vec![p], CellBBox::new(100.0, 100.0, 112.0, 124.0));
        let raster = BitMatrix::new(50, 50);
        assert_eq!(
            panel.run(&outside, Some(&raster)),
            Err(CellError::DegenerateGeometry)
        );
    }
}
