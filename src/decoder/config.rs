//! Decoder tuning knobs.
//!
//! Every constant of the pipeline lives here. Defaults are tuned for dot
//! detections at roughly 10-13 px dot pitch; `from_env` lets a deployment
//! override the common ones without a rebuild.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{BrailleError, Result};

fn parse_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

fn parse_env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_bool_u8(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(default)
}

/// Row and cell grouping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Minimum y-gap (px) that separates two rows
    pub row_floor: f32,
    /// Multiplier on the mean y-gap
    pub row_factor: f32,
    /// Minimum x-gap (px) that separates two cells
    pub cell_floor: f32,
    /// Multiplier on the mean x-gap within a row
    pub cell_factor: f32,
    /// Dot pitch (px) to assume when a row carries no usable geometry
    pub nominal_dot_pitch: Option<f32>,
    /// Cell pitch over dot pitch, used when a row has no adjacent two-column cells
    pub cell_pitch_ratio: f32,
    /// Line pitch over dot pitch, used when fewer than two full-height rows fix the line grid
    pub line_pitch_ratio: f32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            row_floor: 25.0,
            row_factor: 0.7,
            cell_floor: 18.0,
            cell_factor: 1.35,
            nominal_dot_pitch: None,
            cell_pitch_ratio: 2.4,
            line_pitch_ratio: 5.0,
        }
    }
}

/// Per-cell mask estimators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Frame padding as a fraction of its smaller side
    pub padding: f32,
    /// Sampling disk radius as a fraction of the frame's smaller side
    pub sample_radius: f32,
    /// Lit fraction above which a sampled disk counts as a dot
    pub sampling_threshold: f32,
    /// Lit fraction above which a grid rectangle counts as a dot
    pub grid_threshold: f32,
    /// Apply a 3x3 opening before component extraction
    pub component_opening: bool,
    /// Smallest component area (px) accepted as a dot
    pub component_min_area: usize,
    /// Weight of the point-count estimator
    pub point_count_weight: u32,
    /// Weight of the disk sampling estimator
    pub sampling_weight: u32,
    /// Weight of the grid estimator
    pub grid_weight: u32,
    /// Weight of the connected-component estimator
    pub component_weight: u32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            padding: 0.25,
            sample_radius: 0.3,
            sampling_threshold: 0.20,
            grid_threshold: 0.12,
            component_opening: true,
            component_min_area: 4,
            point_count_weight: 1,
            sampling_weight: 2,
            grid_weight: 1,
            component_weight: 1,
        }
    }
}

/// Consensus and correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteConfig {
    /// Grid threshold multiplier for the permissive rescan
    pub rescan_factor: f32,
    /// Largest Hamming distance accepted by nearest-code correction
    pub max_hamming: u32,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            rescan_factor: 0.9,
            max_hamming: 2,
        }
    }
}

/// What to print for a cell that matches no symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Emit the placeholder character
    Placeholder(char),
    /// Emit nothing
    Skip,
}

/// Text assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Gap over cell width beyond which a space is inserted
    pub spacing_factor: f32,
    /// Handling of unrecognized cells
    pub unknown: UnknownPolicy,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            spacing_factor: 2.2,
            unknown: UnknownPolicy::Placeholder('?'),
        }
    }
}

/// Cross-frame stabilization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Largest edit distance at which a known phrase replaces the decoded line
    pub max_edit_distance: usize,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self { max_edit_distance: 4 }
    }
}

/// Full decoder configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Row and cell grouping
    pub cluster: ClusterConfig,
    /// Mask estimators
    pub estimators: EstimatorConfig,
    /// Voting
    pub vote: VoteConfig,
    /// Text assembly
    pub assembly: AssemblyConfig,
    /// Stabilization
    pub stabilizer: StabilizerConfig,
    /// Keep per-cell traces in frame reports
    pub collect_traces: bool,
}

impl DecoderConfig {
    /// Defaults overlaid with `BRAILLE_*` environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `BRAILLE_*` environment overrides on top of `self`
    pub fn with_env_overrides(mut self) -> Self {
        let c = &mut self.cluster;
        c.row_floor = parse_env_f32("BRAILLE_ROW_FLOOR", c.row_floor);
        c.row_factor = parse_env_f32("BRAILLE_ROW_FACTOR", c.row_factor);
        c.cell_floor = parse_env_f32("BRAILLE_CELL_FLOOR", c.cell_floor);
        c.cell_factor = parse_env_f32("BRAILLE_CELL_FACTOR", c.cell_factor);
        c.line_pitch_ratio = parse_env_f32("BRAILLE_LINE_PITCH_RATIO", c.line_pitch_ratio);
        if let Some(pitch) = std::env::var("BRAILLE_DOT_PITCH")
            .ok()
            .and_then(|v| v.trim().parse::<f32>().ok())
        {
            c.nominal_dot_pitch = Some(pitch);
        }

        let e = &mut self.estimators;
        e.sampling_threshold = parse_env_f32("BRAILLE_SAMPLING_THRESHOLD", e.sampling_threshold);
        e.grid_threshold = parse_env_f32("BRAILLE_GRID_THRESHOLD", e.grid_threshold);
        e.component_min_area = parse_env_usize("BRAILLE_COMPONENT_MIN_AREA", e.component_min_area);

        self.vote.max_hamming = parse_env_u32("BRAILLE_MAX_HAMMING", self.vote.max_hamming);
        self.assembly.spacing_factor =
            parse_env_f32("BRAILLE_SPACING_FACTOR", self.assembly.spacing_factor);
        self.stabilizer.max_edit_distance = parse_env_usize(
            "BRAILLE_MAX_EDIT_DISTANCE",
            self.stabilizer.max_edit_distance,
        );
        self.collect_traces = parse_env_bool_u8("BRAILLE_COLLECT_TRACES", self.collect_traces);
        self
    }

    /// Load a JSON config file; missing fields keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: DecoderConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        fn positive(field: &'static str, v: f32) -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(BrailleError::InvalidConfig {
                    field,
                    reason: format!("must be positive, got {v}"),
                })
            }
        }
        fn fraction(field: &'static str, v: f32) -> Result<()> {
            if v > 0.0 && v < 1.0 {
                Ok(())
            } else {
                Err(BrailleError::InvalidConfig {
                    field,
                    reason: format!("must lie in (0, 1), got {v}"),
                })
            }
        }

        positive("cluster.row_floor", self.cluster.row_floor)?;
        positive("cluster.row_factor", self.cluster.row_factor)?;
        positive("cluster.cell_floor", self.cluster.cell_floor)?;
        positive("cluster.cell_factor", self.cluster.cell_factor)?;
        positive("cluster.cell_pitch_ratio", self.cluster.cell_pitch_ratio)?;
        positive("cluster.line_pitch_ratio", self.cluster.line_pitch_ratio)?;
        if let Some(pitch) = self.cluster.nominal_dot_pitch {
            positive("cluster.nominal_dot_pitch", pitch)?;
        }
        if !(self.estimators.padding >= 0.0) {
            return Err(BrailleError::InvalidConfig {
                field: "estimators.padding",
                reason: format!("must not be negative, got {}", self.estimators.padding),
            });
        }
        positive("estimators.sample_radius", self.estimators.sample_radius)?;
        fraction("estimators.sampling_threshold", self.estimators.sampling_threshold)?;
        fraction("estimators.grid_threshold", self.estimators.grid_threshold)?;
        positive("vote.rescan_factor", self.vote.rescan_factor)?;
        positive("assembly.spacing_factor", self.assembly.spacing_factor)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DecoderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.estimators.sampling_weight, 2);
        assert_eq!(config.vote.max_hamming, 2);
        assert_eq!(config.assembly.unknown, UnknownPolicy::Placeholder('?'));
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = DecoderConfig::default();
        config.estimators.grid_threshold = 1.5;
        match config.validate() {
            Err(BrailleError::InvalidConfig { field, .. }) => {
                assert_eq!(field, "estimators.grid_threshold")
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: DecoderConfig =
            serde_json::from_str(r#"{ "stabilizer": { "max_edit_distance": 6 } }"#).unwrap();
        assert_eq!(config.stabilizer.max_edit_distance, 6);
        assert_eq!(config.cluster, ClusterConfig::default());
    }
}
