//! Run summaries.

use crate::error::Result;
use crate::state::RunState;
use crate::stopping::StopReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What one round did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: usize,
    /// Documents revealed this round (the seed size for round 0).
    pub revealed: usize,
    /// Relevant documents among them.
    pub new_relevant: usize,
    pub docs_reviewed: usize,
    pub rel_seen: usize,
    pub zero_steps: usize,
    /// Running `sum_prec / num_rel` after the round.
    pub effectiveness: f64,
}

impl RoundRecord {
    pub fn new(state: &RunState, revealed: usize, new_relevant: usize, num_rel: usize) -> Self {
        Self {
            round: state.step,
            revealed,
            new_relevant,
            docs_reviewed: state.docs_reviewed,
            rel_seen: state.rel_seen,
            zero_steps: state.zero_steps,
            effectiveness: state.effectiveness(num_rel),
        }
    }
}

/// Final summary of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub topic: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stop_reason: StopReason,
    /// Rounds completed after seeding.
    pub rounds: usize,
    pub docs_reviewed: usize,
    pub rel_seen: usize,
    pub num_rel: usize,
    /// `sum_prec / num_rel`.
    pub effectiveness: f64,
    pub history: Vec<RoundRecord>,
}

impl RunReport {
    pub fn recall(&self) -> f64 {
        if self.num_rel == 0 {
            0.0
        } else {
            self.rel_seen as f64 / self.num_rel as f64
        }
    }

    /// Write the report as pretty JSON, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        let now = Utc::now();
        RunReport {
            topic: "401".into(),
            started_at: now,
            finished_at: now,
            stop_reason: StopReason::AllRelevantFound,
            rounds: 2,
            docs_reviewed: 12,
            rel_seen: 4,
            num_rel: 4,
            effectiveness: 0.61,
            history: vec![RoundRecord {
                round: 0,
                revealed: 10,
                new_relevant: 2,
                docs_reviewed: 10,
                rel_seen: 2,
                zero_steps: 0,
                effectiveness: 0.05,
            }],
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("401.report.json");
        report().save(&path).unwrap();
        let loaded = RunReport::load(&path).unwrap();
        assert_eq!(loaded.topic, "401");
        assert_eq!(loaded.stop_reason, StopReason::AllRelevantFound);
        assert_eq!(loaded.history.len(), 1);
        assert!(!dir.path().join("401.report.tmp").exists());
    }

    #[test]
    fn test_stop_reason_serializes_snake_case() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["stop_reason"], "all_relevant_found");
    }

    #[test]
    fn test_recall() {
        assert!((report().recall() - 1.0).abs() < 1e-12);
        let empty = RunReport {
            num_rel: 0,
            ..report()
        };
        assert_eq!(empty.recall(), 0.0);
    }
}
