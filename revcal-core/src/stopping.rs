//! Stopping criteria for the review loop.
//!
//! Criteria are checked in a fixed order after every round, round 0 included,
//! and the first one that holds ends the run.

use crate::config::{RunConfig, StoppingThresholds};
use crate::state::RunState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every relevant document has been revealed.
    AllRelevantFound,
    /// The round limit was reached.
    MaxSteps,
    /// Yield stayed high past the review budget; the topic is too easy.
    HighYield,
    /// Yield is low and the last round added little.
    LowYield,
    /// Too many consecutive rounds without a relevant document.
    Stagnation,
    /// The backend had no unjudged documents left to rank.
    PoolExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AllRelevantFound => "all relevant found",
            Self::MaxSteps => "maximum steps",
            Self::HighYield => "early high-yield cutoff",
            Self::LowYield => "low-yield cutoff",
            Self::Stagnation => "stagnation",
            Self::PoolExhausted => "pool exhausted",
        };
        f.write_str(s)
    }
}

/// Resolved stopping configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct StoppingCriteria {
    pub relstop: bool,
    pub max_steps: usize,
    pub fail_out: bool,
    pub zero_steps: Option<usize>,
    pub thresholds: StoppingThresholds,
}

impl StoppingCriteria {
    /// Resolve the criteria for a run. Without an explicit round limit, the
    /// run may take as many rounds as the topic has judged documents, and is
    /// unbounded when the topic has none. A zero-steps limit of 0 disables
    /// the stagnation rule.
    pub fn from_config(config: &RunConfig, judged: usize) -> Self {
        Self {
            relstop: config.relstop,
            max_steps: match config.max_steps {
                Some(limit) => limit,
                None if judged > 0 => judged,
                None => usize::MAX,
            },
            fail_out: config.fail_out,
            zero_steps: config.zero_steps.filter(|&limit| limit > 0),
            thresholds: config.stopping.clone(),
        }
    }

    /// The first criterion that holds, if any.
    ///
    /// `new_rel` is the number of relevant documents revealed by the round
    /// that just finished; `exhausted` is set when that round's scoring call
    /// returned nothing.
    pub fn evaluate(
        &self,
        state: &RunState,
        num_rel: usize,
        new_rel: usize,
        exhausted: bool,
    ) -> Option<StopReason> {
        let t = &self.thresholds;
        let yield_fraction = state.yield_fraction();

        if self.relstop && state.rel_seen >= num_rel {
            return Some(StopReason::AllRelevantFound);
        }
        if state.step >= self.max_steps {
            return Some(StopReason::MaxSteps);
        }
        if self.fail_out
            && state.docs_reviewed > t.high_yield_min_reviewed
            && yield_fraction > t.high_yield_fraction
        {
            return Some(StopReason::HighYield);
        }
        if self.fail_out
            && state.docs_reviewed > t.low_yield_min_reviewed
            && new_rel < t.low_yield_max_new_relevant
            && yield_fraction < t.low_yield_fraction
        {
            return Some(StopReason::LowYield);
        }
        if let Some(limit) = self.zero_steps.filter(|&limit| limit > 0) {
            if state.zero_steps > limit {
                return Some(StopReason::Stagnation);
            }
        }
        if exhausted {
            return Some(StopReason::PoolExhausted);
        }
        None
    }
}
