//! Weighted consensus over a cell's estimates.
//!
//! Fallback order when the estimators disagree or come back empty:
//! weighted vote, permissive grid rescan, the point-count estimate (when the
//! vote was over raster estimators), bitwise union of all estimates.
//! Whatever mask survives is snapped to the nearest table entry when it is
//! not a known code and one lies within `max_hamming`.

use serde::Serialize;
use tracing::trace;

use super::CellError;
use super::config::VoteConfig;
use super::estimators::Estimate;
use super::symbols::SymbolTable;
use crate::models::CellMask;

/// How the chosen mask was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoteSource {
    /// Known code won the weighted vote
    Consensus,
    /// Known code from the permissive rescan
    Rescan,
    /// Known code from the dot points after the raster came back empty
    PointFallback,
    /// Known code from the union of all estimates
    Union,
    /// Unknown mask replaced by the nearest table entry
    Corrected {
        /// Mask before correction
        from: CellMask,
        /// Hamming distance to the replacement
        distance: u32,
    },
    /// Unknown mask with no table entry in range, kept raw
    Uncorrected,
    /// Nothing to choose from
    Empty,
}

/// Outcome of voting for one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Vote {
    /// Chosen mask
    pub mask: Option<CellMask>,
    /// Path that produced it
    pub source: VoteSource,
}

impl Vote {
    /// The chosen mask, or [`CellError::NoEstimatesAvailable`]
    pub fn mask(&self) -> Result<CellMask, CellError> {
        self.mask.ok_or(CellError::NoEstimatesAvailable)
    }
}

/// Picks one mask per cell
#[derive(Debug, Clone, Copy)]
pub struct MaskVoter<'a> {
    table: &'a SymbolTable,
    max_hamming: u32,
}

impl<'a> MaskVoter<'a> {
    /// Voter correcting towards `table` within the configured distance
    pub fn new(table: &'a SymbolTable, config: &VoteConfig) -> Self {
        Self {
            table,
            max_hamming: config.max_hamming,
        }
    }

    /// Weighted vote winner.
    ///
    /// Estimates are enumerated by weight, heaviest first and stable
    /// otherwise. Empty masks and zero weights do not vote. Ties go to the
    /// mask encountered first in that enumeration.
    pub fn tally(estimates: &[Estimate]) -> Option<CellMask> {
        let mut ordered: Vec<&Estimate> = estimates.iter().collect();
        ordered.sort_by(|a, b| b.weight.cmp(&a.weight));

        let mut totals: Vec<(CellMask, u32)> = Vec::new();
        for e in ordered {
            let Some(mask) = e.mask.filter(|m| !m.is_empty()) else {
                continue;
            };
            if e.weight == 0 {
                continue;
            }
            match totals.iter_mut().find(|(m, _)| *m == mask) {
                Some((_, total)) => *total += e.weight,
                None => totals.push((mask, e.weight)),
            }
        }

        let mut best: Option<(CellMask, u32)> = None;
        for (mask, total) in totals {
            if best.is_none_or(|(_, t)| total > t) {
                best = Some((mask, total));
            }
        }
        best.map(|(mask, _)| mask)
    }

    /// Choose a mask. `rescan` runs only when no estimate carries a vote.
    pub fn vote<F>(&self, estimates: &[Estimate], rescan: F) -> Vote
    where
        F: FnOnce() -> Option<CellMask>,
    {
        self.vote_with_fallback(estimates, rescan, Vec::new)
    }

    /// [`vote`](Self::vote) with a second set of estimates, tallied only when
    /// both the vote and the rescan come back empty.
    pub fn vote_with_fallback<F, G>(&self, estimates: &[Estimate], rescan: F, fallback: G) -> Vote
    where
        F: FnOnce() -> Option<CellMask>,
        G: FnOnce() -> Vec<Estimate>,
    {
        let vote = if let Some(winner) = Self::tally(estimates) {
            self.finish(winner, VoteSource::Consensus)
        } else if let Some(rescanned) = rescan().filter(|m| !m.is_empty()) {
            self.finish(rescanned, VoteSource::Rescan)
        } else if let Some(points) = Self::tally(&fallback()) {
            self.finish(points, VoteSource::PointFallback)
        } else {
            let union = estimates
                .iter()
                .filter_map(|e| e.mask)
                .fold(CellMask::EMPTY, |acc, m| acc | m);
            if union.is_empty() {
                Vote {
                    mask: None,
                    source: VoteSource::Empty,
                }
            } else {
                self.finish(union, VoteSource::Union)
            }
        };
        trace!(mask = ?vote.mask, source = ?vote.source, "cell vote");
        vote
    }

    fn finish(&self, mask: CellMask, known_source: VoteSource) -> Vote {
        if self.table.is_known(mask) {
            return Vote {
                mask: Some(mask),
                source: known_source,
            };
        }
        match self.table.nearest_known(mask, self.max_hamming) {
            Some((corrected, distance)) => Vote {
                mask: Some(corrected),
                source: VoteSource::Corrected {
                    from: mask,
                    distance,
                },
            },
            None => Vote {
                mask: Some(mask),
                source: VoteSource::Uncorrected,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn est(estimator: &'static str, weight: u32, dots: Option<&[u8]>) -> Estimate {
        Estimate {
            estimator,
            weight,
            mask: dots.map(CellMask::from_dots),
        }
    }

    fn mask(dots: &[u8]) -> CellMask {
        CellMask::from_dots(dots)
    }

    #[test]
    fn test_majority_wins() {
        let table = SymbolTable::standard();
        let voter = MaskVoter::new(&table, &VoteConfig::default());
        let estimates = [
            est("point_count", 1, Some(&[1])),
            est("grid", 1, Some(&[1, 2])),
            est("components", 1, Some(&[1, 2])),
        ];
        let vote = voter.vote(&estimates, || None);
        assert_eq!(vote.mask, Some(mask(&[1, 2])));
        assert_eq!(vote.source, VoteSource::Consensus);
    }

    #[test]
    fn test_tie_goes_to_heaviest_first() {
        // x: 2 votes from sampling; y: 1 + 1 from grid and components.
        let x = &[1, 3, 4, 6][..];
        let y = &[1, 3, 4, 5, 6][..];
        let estimates = [
            est("grid", 1, Some(y)),
            est("sampling", 2, Some(x)),
            est("components", 1, Some(y)),
        ];
        assert_eq!(MaskVoter::tally(&estimates), Some(mask(x)));

        // Equal weights: input order decides.
        let estimates = [est("a", 1, Some(y)), est("b", 1, Some(x))];
        assert_eq!(MaskVoter::tally(&estimates), Some(mask(y)));
        assert_eq!(MaskVoter::tally(&estimates), MaskVoter::tally(&estimates));
    }

    #[test]
    fn test_empty_masks_and_zero_weights_do_not_vote() {
        let estimates = [
            est("sampling", 2, Some(&[])),
            est("grid", 0, Some(&[1])),
            est("components", 1, None),
        ];
        assert_eq!(MaskVoter::tally(&estimates), None);
    }

    #[test]
    fn test_unknown_winner_is_corrected() {
        let table = SymbolTable::standard();
        let voter = MaskVoter::new(&table, &VoteConfig::default());
        let vote = voter.vote(&[est("sampling", 2, Some(&[1, 2, 3, 4, 5, 6]))], || None);
        assert_eq!(vote.mask, Some(mask(&[1, 2, 3, 4, 5])));
        assert_eq!(
            vote.source,
            VoteSource::Corrected {
                from: CellMask::FULL,
                distance: 1
            }
        );

        let strict = MaskVoter::new(
            &table,
            &VoteConfig {
                max_hamming: 0,
                ..VoteConfig::default()
            },
        );
        let vote = strict.vote(&[est("sampling", 2, Some(&[1, 2, 3, 4, 5, 6]))], || None);
        assert_eq!(vote.mask, Some(CellMask::FULL));
        assert_eq!(vote.source, VoteSource::Uncorrected);
    }

    #[test]
    fn test_rescan_runs_only_without_votes() {
        let table = SymbolTable::standard();
        let voter = MaskVoter::new(&table, &VoteConfig::default());
        let called = Cell::new(false);

        let vote = voter.vote(&[est("grid", 1, Some(&[1]))], || {
            called.set(true);
            None
        });
        assert_eq!(vote.source, VoteSource::Consensus);
        assert!(!called.get());

        let vote = voter.vote(&[est("grid", 1, None)], || Some(mask(&[1, 4])));
        assert_eq!(vote.mask, Some(mask(&[1, 4])));
        assert_eq!(vote.source, VoteSource::Rescan);
    }

    #[test]
    fn test_point_fallback_order() {
        let table = SymbolTable::standard();
        let voter = MaskVoter::new(&table, &VoteConfig::default());
        let blank = [est("sampling", 2, None), est("grid", 1, None)];
        let points = || vec![est("point_count", 1, Some(&[1, 2, 4, 5]))];

        let vote = voter.vote_with_fallback(&blank, || None, points);
        assert_eq!(vote.mask, Some(mask(&[1, 2, 4, 5])));
        assert_eq!(vote.source, VoteSource::PointFallback);

        // A rescan hit comes first.
        let vote = voter.vote_with_fallback(&blank, || Some(mask(&[1, 3, 5])), points);
        assert_eq!(vote.source, VoteSource::Rescan);

        // Consensus never looks at the points.
        let called = Cell::new(false);
        let vote = voter.vote_with_fallback(&[est("grid", 1, Some(&[1]))], || None, || {
            called.set(true);
            Vec::new()
        });
        assert_eq!(vote.source, VoteSource::Consensus);
        assert!(!called.get());

        // An unknown point pattern is still corrected.
        let vote = voter.vote_with_fallback(&blank, || None, || {
            vec![est("point_count", 1, Some(&[1, 2, 3, 4, 5, 6]))]
        });
        assert_eq!(vote.mask, Some(mask(&[1, 2, 3, 4, 5])));
        assert!(matches!(vote.source, VoteSource::Corrected { distance: 1, .. }));
    }

    #[test]
    fn test_union_fallback() {
        let table = SymbolTable::standard();
        let voter = MaskVoter::new(&table, &VoteConfig::default());
        // Zero-weight estimates still feed the union.
        let estimates = [est("a", 0, Some(&[1])), est("b", 0, Some(&[4]))];
        let vote = voter.vote(&estimates, || None);
        assert_eq!(vote.mask, Some(mask(&[1, 4])));
        assert_eq!(vote.source, VoteSource::Union);
    }

    #[test]
    fn test_nothing_to_vote_on() {
        let table = SymbolTable::standard();
        let voter = MaskVoter::new(&table, &VoteConfig::default());
        let vote = voter.vote(&[est("grid", 1, None), est("sampling", 2, Some(&[]))], || None);
        assert_eq!(vote.mask, None);
        assert_eq!(vote.source, VoteSource::Empty);
        assert_eq!(vote.mask(), Err(CellError::NoEstimatesAvailable));
        assert_eq!(voter.vote(&[], || None).source, VoteSource::Empty);
    }
}
