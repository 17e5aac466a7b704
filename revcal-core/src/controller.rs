//! Review loop controller.
//!
//! Drives one topic through `Seeding → Training(0) → [Scoring(k) →
//! Revealing(k) → Retraining(k)]*` until a stopping criterion holds. Rounds
//! run strictly in sequence: no round starts before the previous round's
//! model has been trained. [`RunState`] is threaded through every round by
//! value and the persisted training files are the run's history.

use crate::backend::{self, ModelHandle, RankingBackend};
use crate::config::RunConfig;
use crate::error::{CalError, Result, RunPhase};
use crate::lock::{self, CollectionLock};
use crate::pool;
use crate::qrels::Qrels;
use crate::report::{RoundRecord, RunReport};
use crate::state::RunState;
use crate::stopping::{StopReason, StoppingCriteria};
use crate::training_set::{LabeledDoc, TrainingSet, TrainingSetStore};
use chrono::Utc;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Observer notified as the run progresses.
pub trait RoundCallback: Send {
    /// Called after every round, round 0 included.
    fn on_round_end(&mut self, topic: &str, record: &RoundRecord, state: &RunState, num_rel: usize);

    /// Called once when a stopping criterion fires.
    fn on_stop(&mut self, _topic: &str, _reason: StopReason, _state: &RunState) {}
}

/// A callback that ignores everything.
pub struct NoOpCallback;

impl RoundCallback for NoOpCallback {
    fn on_round_end(&mut self, _: &str, _: &RoundRecord, _: &RunState, _: usize) {}
}

/// Result of one model-driven round.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub state: RunState,
    /// Documents revealed this round.
    pub revealed: usize,
    /// Relevant documents among them.
    pub new_relevant: usize,
}

impl RoundOutcome {
    /// True when the backend had nothing left to rank.
    pub fn exhausted(&self) -> bool {
        self.revealed == 0
    }
}

/// The review loop for one topic.
pub struct ReviewLoop {
    topic: String,
    pool: PathBuf,
    train_rank: u32,
    num_docs: usize,
    qrels: Qrels,
    num_rel: usize,
    store: TrainingSetStore,
    backend: Arc<dyn RankingBackend>,
    lock: Arc<dyn CollectionLock>,
    criteria: StoppingCriteria,
}

impl ReviewLoop {
    pub fn new(
        config: &RunConfig,
        qrels: Qrels,
        backend: Arc<dyn RankingBackend>,
        lock: Arc<dyn CollectionLock>,
    ) -> Self {
        let num_rel = qrels.total_relevant();
        let criteria = StoppingCriteria::from_config(config, qrels.len());
        Self {
            topic: config.topic.clone(),
            pool: config.pool.clone(),
            train_rank: config.train_rank,
            num_docs: config.num_docs,
            num_rel,
            store: TrainingSetStore::new(&config.work_dir, &config.topic),
            qrels,
            backend,
            lock,
            criteria,
        }
    }

    /// Load judgments and build the backend and lock the configuration asks for.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        config.validate()?;
        let qrels = Qrels::load(&config.qrels, &config.topic)?;
        let backend: Arc<dyn RankingBackend> = backend::from_config(&config.backend)?.into();
        let lock = lock::from_config(&config.lock);
        info!(
            topic = %config.topic,
            backend = backend.name(),
            lock = %lock.describe(),
            judged = qrels.len(),
            num_rel = qrels.total_relevant(),
            "Review loop configured"
        );
        Ok(Self::new(config, qrels, backend, lock))
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn num_rel(&self) -> usize {
        self.num_rel
    }

    pub fn criteria(&self) -> &StoppingCriteria {
        &self.criteria
    }

    pub fn store(&self) -> &TrainingSetStore {
        &self.store
    }

    /// Run until a stopping criterion fires.
    pub async fn run(&self, callback: &mut dyn RoundCallback) -> Result<RunReport> {
        let started_at = Utc::now();

        let mut state = self.seed().await?;
        let seed_record =
            RoundRecord::new(&state, state.docs_reviewed, state.rel_seen, self.num_rel);
        callback.on_round_end(&self.topic, &seed_record, &state, self.num_rel);
        let mut history = vec![seed_record];

        let mut new_relevant = state.rel_seen;
        let mut exhausted = false;
        let stop_reason = loop {
            let verdict = self
                .criteria
                .evaluate(&state, self.num_rel, new_relevant, exhausted);
            if let Some(reason) = verdict {
                break reason;
            }

            let outcome = self.run_round(state).await?;
            exhausted = outcome.exhausted();
            new_relevant = outcome.new_relevant;
            state = outcome.state;

            let record = RoundRecord::new(&state, outcome.revealed, new_relevant, self.num_rel);
            callback.on_round_end(&self.topic, &record, &state, self.num_rel);
            history.push(record);
        };

        info!(
            topic = %self.topic,
            reason = %stop_reason,
            rounds = state.step,
            docs_reviewed = state.docs_reviewed,
            rel_seen = state.rel_seen,
            num_rel = self.num_rel,
            "Stopping"
        );
        callback.on_stop(&self.topic, stop_reason, &state);

        Ok(RunReport {
            topic: self.topic.clone(),
            started_at,
            finished_at: Utc::now(),
            stop_reason,
            rounds: state.step,
            docs_reviewed: state.docs_reviewed,
            rel_seen: state.rel_seen,
            num_rel: self.num_rel,
            effectiveness: state.effectiveness(self.num_rel),
            history,
        })
    }

    /// Round 0: build the seed training set from the pool, persist it, and
    /// train the first model.
    pub async fn seed(&self) -> Result<RunState> {
        let candidates = pool::seed_candidates(&self.pool, &self.topic, self.train_rank)
            .map_err(|e| self.abort(e, 0, RunPhase::Seeding))?;
        if candidates.is_empty() {
            return Err(self.abort(
                CalError::EmptySeed {
                    topic: self.topic.clone(),
                },
                0,
                RunPhase::Seeding,
            ));
        }

        let set = TrainingSet::seed(&self.topic, &candidates, &self.qrels)
            .map_err(|e| self.abort(e, 0, RunPhase::Seeding))?;
        self.store
            .write(&set)
            .map_err(|e| self.abort(e, 0, RunPhase::Seeding))?;

        self.train(0)
            .await
            .map_err(|e| self.abort(e, 0, RunPhase::Training))?;

        let state = RunState::seeded(set.len(), set.relevant_count());
        info!(
            topic = %self.topic,
            docs_reviewed = state.docs_reviewed,
            rel_seen = state.rel_seen,
            num_rel = self.num_rel,
            "Seed training set built"
        );
        Ok(state)
    }

    /// One model-driven round: score with the previous round's model, reveal
    /// the results, persist the extended training set and retrain.
    pub async fn run_round(&self, mut state: RunState) -> Result<RoundOutcome> {
        let round = state.step + 1;
        let previous = round - 1;

        let base = self
            .store
            .read(previous)
            .map_err(|e| self.abort(e, round, RunPhase::Scoring))?;
        let model = ModelHandle::new(self.store.model_path(previous));
        let mut scored = self
            .backend
            .score(&model, &self.store.train_path(previous), self.num_docs)
            .await
            .map_err(|e| self.abort(e, round, RunPhase::Scoring))?;
        if scored.len() > self.num_docs {
            warn!(
                topic = %self.topic,
                round,
                returned = scored.len(),
                requested = self.num_docs,
                "Backend returned more documents than requested; truncating"
            );
            scored.truncate(self.num_docs);
        }

        let mut revealed = Vec::with_capacity(scored.len());
        let mut seen_this_round = HashSet::with_capacity(scored.len());
        let mut new_relevant = 0;
        for doc in scored {
            if base.contains(&doc.docid) || !seen_this_round.insert(doc.docid.clone()) {
                return Err(self.abort(
                    CalError::AlreadyJudged {
                        docid: doc.docid,
                        round,
                    },
                    round,
                    RunPhase::Revealing,
                ));
            }
            let relevance = self.qrels.relevance_of(&doc.docid);
            state.docs_reviewed += 1;
            if relevance > 0 {
                state.rel_seen += 1;
                state.rel_seen_after_training += 1;
                new_relevant += 1;
                state.zero_steps = 0;
            }
            debug!(
                topic = %self.topic,
                round,
                docid = %doc.docid,
                score = doc.score,
                relevance,
                "Adding to training"
            );
            revealed.push(LabeledDoc::new(doc.docid, relevance));
        }
        if new_relevant == 0 {
            state.zero_steps += 1;
        }

        let next = base
            .extend(&revealed)
            .map_err(|e| self.abort(e, round, RunPhase::Retraining))?;
        self.store
            .write(&next)
            .map_err(|e| self.abort(e, round, RunPhase::Retraining))?;
        self.train(round)
            .await
            .map_err(|e| self.abort(e, round, RunPhase::Retraining))?;

        if new_relevant > 0 {
            state.sample_precision();
        }
        state.step = round;

        info!(
            topic = %self.topic,
            round,
            revealed = revealed.len(),
            new_relevant,
            docs_reviewed = state.docs_reviewed,
            rel_seen = state.rel_seen,
            num_rel = self.num_rel,
            zero_steps = state.zero_steps,
            "Round complete"
        );
        Ok(RoundOutcome {
            state,
            revealed: revealed.len(),
            new_relevant,
        })
    }

    /// Train the model for `round` under the collection lock.
    async fn train(&self, round: usize) -> Result<ModelHandle> {
        let _guard = lock::acquire(Arc::clone(&self.lock)).await?;
        self.backend
            .train(&self.store.model_path(round), &self.store.train_path(round))
            .await
    }

    fn abort(&self, err: CalError, round: usize, phase: RunPhase) -> CalError {
        error!(topic = %self.topic, round, %phase, error = %err, "Run aborted");
        err.in_round(round, phase)
    }
}
