//! # revcal core
//!
//! Simulates a continuous active learning (CAL) review over a test
//! collection. Given a topic, a ranked pool and ground-truth judgments, the
//! review loop repeatedly trains a ranking model on the judgments revealed so
//! far, asks it for the best unjudged documents, reveals their labels and
//! folds them back into the training set until a stopping criterion fires.

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod lock;
pub mod pool;
pub mod qrels;
pub mod report;
pub mod state;
pub mod stopping;
pub mod training_set;

// Re-export commonly used types at the crate root.
pub use backend::{
    HttpBackend, MockRankingBackend, ModelHandle, ProcessBackend, RankingBackend, ScoredDoc,
};
pub use config::{BackendConfig, LockConfig, RunConfig, StoppingThresholds, Transport, load_config};
pub use controller::{NoOpCallback, ReviewLoop, RoundCallback, RoundOutcome};
pub use error::{CalError, Result, RunPhase};
pub use lock::{CollectionLock, FileLock, LockGuard, NoopLock};
pub use qrels::{Qrels, RelevanceJudgment};
pub use report::{RoundRecord, RunReport};
pub use state::RunState;
pub use stopping::{StopReason, StoppingCriteria};
pub use training_set::{LabeledDoc, TrainingSet, TrainingSetStore};
