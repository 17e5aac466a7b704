//! Per-run accumulators.

use serde::{Deserialize, Serialize};

/// Counters owned by the review loop. Passed into and returned from every
/// round; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Current round number.
    pub step: usize,
    /// Documents revealed so far, seed included.
    pub docs_reviewed: usize,
    /// Revealed documents with relevance > 0.
    pub rel_seen: usize,
    /// Relevant documents revealed after round 0.
    pub rel_seen_after_training: usize,
    /// Consecutive rounds that found nothing relevant.
    pub zero_steps: usize,
    /// Sum of recall-ordered precision samples, taken whenever a round finds
    /// something relevant.
    pub sum_prec: f64,
}

impl RunState {
    /// State after revealing the seed set.
    pub fn seeded(docs_reviewed: usize, rel_seen: usize) -> Self {
        let mut state = Self {
            docs_reviewed,
            rel_seen,
            ..Self::default()
        };
        state.sample_precision();
        state
    }

    /// Fraction of reviewed documents that were relevant.
    pub fn yield_fraction(&self) -> f64 {
        if self.docs_reviewed == 0 {
            0.0
        } else {
            self.rel_seen as f64 / self.docs_reviewed as f64
        }
    }

    /// Add the current precision to the running sum.
    pub fn sample_precision(&mut self) {
        self.sum_prec += self.yield_fraction();
    }

    /// `sum_prec / num_rel`, or 0 when the topic has no relevant documents.
    pub fn effectiveness(&self, num_rel: usize) -> f64 {
        if num_rel == 0 {
            0.0
        } else {
            self.sum_prec / num_rel as f64
        }
    }

    /// Relevant documents found per model-driven round.
    pub fn step_set_precision(&self) -> f64 {
        if self.step == 0 {
            0.0
        } else {
            self.rel_seen_after_training as f64 / self.step as f64
        }
    }
}
