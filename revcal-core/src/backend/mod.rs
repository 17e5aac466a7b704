//! Ranking backend trait and implementations.
//!
//! The review loop only needs two things from a ranking engine: train a model
//! from a training file, and score the unjudged part of the collection. Both
//! transports below are behaviorally interchangeable.

pub mod http;
pub mod mock;
pub mod process;

use crate::config::{BackendConfig, Transport};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use http::HttpBackend;
pub use mock::MockRankingBackend;
pub use process::ProcessBackend;

/// A document returned by a scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub docid: String,
    pub score: f64,
}

impl ScoredDoc {
    pub fn new(docid: impl Into<String>, score: f64) -> Self {
        Self {
            docid: docid.into(),
            score,
        }
    }
}

/// Identifies a trained model artifact. The artifact is opaque to revcal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle {
    path: PathBuf,
}

impl ModelHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Ranking backend trait.
#[async_trait]
pub trait RankingBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Build (or overwrite) the model at `model_path` from `training_file`.
    ///
    /// Callers must hold the collection lock.
    async fn train(&self, model_path: &Path, training_file: &Path) -> Result<ModelHandle>;

    /// Up to `n` documents ranked by descending score, none of which appear
    /// in `exclude_file`.
    async fn score(
        &self,
        model: &ModelHandle,
        exclude_file: &Path,
        n: usize,
    ) -> Result<Vec<ScoredDoc>>;
}

/// Construct the backend selected by configuration.
pub fn from_config(config: &BackendConfig) -> Result<Box<dyn RankingBackend>> {
    Ok(match config.transport {
        Transport::Process => Box::new(ProcessBackend::new(
            &config.collection,
            &config.train_program,
            &config.score_program,
        )),
        Transport::Http => Box::new(HttpBackend::from_config(config)?),
    })
}
