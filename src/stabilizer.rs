//! Cross-frame stabilization of decoded lines.
//!
//! A decoded line is snapped to the closest known phrase when it is within
//! `max_edit_distance` edits, and only emitted when it differs from the
//! previous emission.

use tracing::{debug, info};

use crate::decoder::config::StabilizerConfig;

/// Uppercase, drop line breaks and trim surrounding spaces
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .collect::<String>()
        .trim_matches(' ')
        .to_uppercase()
}

fn strip_breaks(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .collect::<String>()
        .trim_matches(' ')
        .to_string()
}

#[derive(Debug, Clone)]
struct Target {
    normalized: String,
    canonical: String,
}

/// Remembers the last emission and the phrases lines are corrected towards
#[derive(Debug, Clone)]
pub struct SequenceStabilizer {
    max_edit_distance: usize,
    targets: Vec<Target>,
    last_emitted: Option<String>,
}

impl SequenceStabilizer {
    /// Stabilizer without known phrases
    pub fn new(config: &StabilizerConfig) -> Self {
        Self {
            max_edit_distance: config.max_edit_distance,
            targets: Vec::new(),
            last_emitted: None,
        }
    }

    /// Replace the known phrases. Phrases that normalize to nothing are dropped.
    pub fn set_targets<I, S>(&mut self, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.targets = targets
            .into_iter()
            .map(|t| Target {
                normalized: normalize(t.as_ref()),
                canonical: t.as_ref().trim().to_string(),
            })
            .filter(|t| !t.normalized.is_empty())
            .collect();
    }

    /// Builder form of [`set_targets`](Self::set_targets)
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_targets(targets);
        self
    }

    /// Closest known phrase and its edit distance. Ties keep the earlier phrase.
    pub fn closest_target(&self, line: &str) -> Option<(&str, usize)> {
        let normalized = normalize(line);
        let mut best: Option<(&Target, usize)> = None;
        for target in &self.targets {
            let d = strsim::levenshtein(&normalized, &target.normalized);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((target, d));
            }
        }
        best.map(|(t, d)| (t.canonical.as_str(), d))
    }

    /// Line after correction, before the change check
    pub fn candidate(&self, line: &str) -> String {
        if normalize(line).is_empty() {
            return String::new();
        }
        match self.closest_target(line) {
            Some((canonical, d)) if d <= self.max_edit_distance => {
                debug!(line, canonical, distance = d, "snapped to known phrase");
                canonical.to_string()
            }
            _ => strip_breaks(line),
        }
    }

    /// Feed one decoded line; returns the text to emit, if any
    pub fn push(&mut self, line: &str) -> Option<String> {
        let candidate = self.candidate(line);
        if candidate.is_empty() || self.last_emitted.as_deref() == Some(candidate.as_str()) {
            return None;
        }
        info!(text = %candidate, "emit");
        self.last_emitted = Some(candidate.clone());
        Some(candidate)
    }

    /// Last emitted text
    pub fn last_emitted(&self) -> Option<&str> {
        self.last_emitted.as_deref()
    }
}

impl Default for SequenceStabilizer {
    fn default() -> Self {
        Self::new(&StabilizerConfig::default())
    }
}
