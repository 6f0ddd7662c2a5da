use serde::{Deserialize, Serialize};

/// Default tolerance below which summed score evidence counts as "no evidence".
pub const DEFAULT_STRAND_EPSILON: f64 = 1e-8;

/// Parameters handed to a [`crate::graph::trim::NodeTrimmer`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimParams {
    /// Nodes shorter than this (bp) are never trimmed.
    pub min_trim_length: u32,

    /// Start/end nodes scoring below `fraction * neighbour score` are trimmed.
    pub utr_fraction: f64,

    /// Intron-retaining nodes scoring below `fraction * max(flank score)` are trimmed.
    pub intron_fraction: f64,
}

impl Default for TrimParams {
    fn default() -> Self {
        Self {
            min_trim_length: 0,
            utr_fraction: 0.0,
            intron_fraction: 0.0,
        }
    }
}

/// Options controlling graph construction for one locus.
///
/// IMPORTANT:
/// - The defaults trim nothing and merge chains across introns.
/// - `strand_epsilon` decides when score evidence is inconclusive; results
///   near ties depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphOptions {
    pub trim: TrimParams,

    /// Minimum summed (score * bp) evidence needed to vote a strand by score.
    pub strand_epsilon: f64,

    /// Collapse linear chains even when consecutive nodes are separated by an intron.
    pub merge_through_introns: bool,

    /// Keep per-strand score-track rows of the untrimmed graphs.
    pub score_tracks: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            trim: TrimParams::default(),
            strand_epsilon: DEFAULT_STRAND_EPSILON,
            merge_through_introns: true,
            score_tracks: false,
        }
    }
}

impl GraphOptions {
    pub fn with_trim(
        mut self,
        min_trim_length: u32,
        utr_fraction: f64,
        intron_fraction: f64,
    ) -> Self {
        self.trim = TrimParams {
            min_trim_length,
            utr_fraction,
            intron_fraction,
        };
        self
    }

    pub fn with_strand_epsilon(mut self, epsilon: f64) -> Self {
        self.strand_epsilon = epsilon;
        self
    }

    pub fn with_score_tracks(mut self, enabled: bool) -> Self {
        self.score_tracks = enabled;
        self
    }

    pub fn with_intron_merge(mut self, enabled: bool) -> Self {
        self.merge_through_introns = enabled;
        self
    }
}
