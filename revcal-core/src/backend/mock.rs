//! A mock ranking backend for testing and dry runs.
//!
//! Ranks a fixed list of docids, honoring the exclusion file the same way a
//! real engine does. Individual scoring answers can be queued to simulate a
//! misbehaving engine.

use super::{ModelHandle, RankingBackend, ScoredDoc};
use crate::error::{CalError, Result};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A training call seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainCall {
    pub model_path: PathBuf,
    pub training_file: PathBuf,
    /// Number of lines in the training file when the call was made.
    pub examples: usize,
}

pub struct MockRankingBackend {
    ranking: Vec<String>,
    queued: Mutex<VecDeque<Vec<ScoredDoc>>>,
    train_calls: Mutex<Vec<TrainCall>>,
    score_calls: Mutex<usize>,
    fail_train_on: Mutex<Option<usize>>,
}

impl MockRankingBackend {
    /// A backend that always ranks `ranking` in the given order.
    pub fn new<I, S>(ranking: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ranking: ranking.into_iter().map(Into::into).collect(),
            queued: Mutex::new(VecDeque::new()),
            train_calls: Mutex::new(Vec::new()),
            score_calls: Mutex::new(0),
            fail_train_on: Mutex::new(None),
        }
    }

    /// Return `docs` verbatim from the next `score` call.
    pub fn queue_scores(&self, docs: Vec<ScoredDoc>) {
        self.queued.lock().unwrap().push_back(docs);
    }

    /// Make the `n`th training call (0-based) fail.
    pub fn fail_train_on(&self, n: usize) {
        *self.fail_train_on.lock().unwrap() = Some(n);
    }

    pub fn train_calls(&self) -> Vec<TrainCall> {
        self.train_calls.lock().unwrap().clone()
    }

    pub fn score_calls(&self) -> usize {
        *self.score_calls.lock().unwrap()
    }
}

#[async_trait]
impl RankingBackend for MockRankingBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn train(&self, model_path: &Path, training_file: &Path) -> Result<ModelHandle> {
        let examples = std::fs::read_to_string(training_file)?.lines().count();
        let mut calls = self.train_calls.lock().unwrap();
        if *self.fail_train_on.lock().unwrap() == Some(calls.len()) {
            return Err(CalError::backend("mock", "train", "injected failure"));
        }
        calls.push(TrainCall {
            model_path: model_path.to_path_buf(),
            training_file: training_file.to_path_buf(),
            examples,
        });
        Ok(ModelHandle::new(model_path))
    }

    async fn score(
        &self,
        _model: &ModelHandle,
        exclude_file: &Path,
        n: usize,
    ) -> Result<Vec<ScoredDoc>> {
        *self.score_calls.lock().unwrap() += 1;
        if let Some(docs) = self.queued.lock().unwrap().pop_front() {
            return Ok(docs);
        }
        let content = std::fs::read_to_string(exclude_file)?;
        let excluded: HashSet<&str> = content
            .lines()
            .filter_map(|line| line.split_whitespace().nth(2))
            .collect();
        Ok(self
            .ranking
            .iter()
            .filter(|docid| !excluded.contains(docid.as_str()))
            .take(n)
            .enumerate()
            .map(|(i, docid)| ScoredDoc::new(docid.clone(), 1.0 / (i + 1) as f64))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_score_skips_excluded_docs() {
        let dir = tempfile::tempdir().unwrap();
        let exclude = dir.path().join("t.0");
        std::fs::write(&exclude, "T1 0 a 1\nT1 0 c 0\n").unwrap();
        let backend = MockRankingBackend::new(["a", "b", "c", "d", "e"]);

        let docs = backend
            .score(&ModelHandle::new("m"), &exclude, 2)
            .await
            .unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.docid.as_str()).collect();
        assert_eq!(ids, vec!["b", "d"]);
        assert!(docs[0].score > docs[1].score);
        assert_eq!(backend.score_calls(), 1);
    }

    #[tokio::test]
    async fn test_queued_scores_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let exclude = dir.path().join("t.0");
        std::fs::write(&exclude, "T1 0 a 1\n").unwrap();
        let backend = MockRankingBackend::new(["a", "b"]);
        backend.queue_scores(vec![ScoredDoc::new("a", 9.0)]);

        let docs = backend.score(&ModelHandle::new("m"), &exclude, 1).await.unwrap();
        assert_eq!(docs, vec![ScoredDoc::new("a", 9.0)]);
        let docs = backend.score(&ModelHandle::new("m"), &exclude, 1).await.unwrap();
        assert_eq!(docs, vec![ScoredDoc::new("b", 1.0)]);
    }

    #[tokio::test]
    async fn test_train_records_calls_and_injected_failure() {
        let dir = tempfile::tempdir().unwrap();
        let train = dir.path().join("t.0");
        std::fs::write(&train, "T1 0 a 1\nT1 0 b 0\n").unwrap();
        let backend = MockRankingBackend::new(Vec::<String>::new());
        backend.fail_train_on(1);

        backend.train(Path::new("m.0"), &train).await.unwrap();
        assert!(backend.train(Path::new("m.1"), &train).await.is_err());
        assert_eq!(
            backend.train_calls(),
            vec![TrainCall {
                model_path: PathBuf::from("m.0"),
                training_file: train.clone(),
                examples: 2,
            }]
        );
    }
}
