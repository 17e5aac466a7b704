//! Error types for the revcal core library.
//!
//! Every fault is fatal for a run: there is no retry or partial-failure path.
//! Faults raised inside the round loop are wrapped in [`CalError::RoundFailed`]
//! so the final diagnostic names the round and phase that failed.

use std::fmt;
use std::path::PathBuf;

/// Top-level error type for the revcal core library.
#[derive(Debug, thiserror::Error)]
pub enum CalError {
    #[error("{}:{line}: malformed judgment line {content:?}", .path.display())]
    MalformedJudgmentLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("{}:{line}: malformed pool line {content:?}", .path.display())]
    MalformedPoolLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("{}:{line}: malformed training line {content:?}", .path.display())]
    MalformedTrainingLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("{}: expected topic {expected}, found {found}", .path.display())]
    TopicMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("document {docid} is already in the training set for round {round}")]
    DuplicateDocument { docid: String, round: usize },

    #[error("scored document {docid} was already judged before round {round}")]
    AlreadyJudged { docid: String, round: usize },

    #[error("{backend} backend failed to {operation}: {message}")]
    BackendUnavailable {
        backend: String,
        operation: String,
        message: String,
    },

    #[error("{backend} backend returned unparseable output: {message}")]
    MalformedBackendOutput { backend: String, message: String },

    #[error("pool yielded no seed candidates for topic {topic}")]
    EmptySeed { topic: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("round {round} failed while {phase}: {source}")]
    RoundFailed {
        round: usize,
        phase: RunPhase,
        #[source]
        source: Box<CalError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CalError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn backend(
        backend: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::BackendUnavailable {
            backend: backend.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Attach the round and phase a fault was raised in.
    pub fn in_round(self, round: usize, phase: RunPhase) -> Self {
        Self::RoundFailed {
            round,
            phase,
            source: Box::new(self),
        }
    }

    /// The underlying fault with any `RoundFailed` context stripped.
    pub fn root(&self) -> &CalError {
        match self {
            Self::RoundFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Phases of the review loop state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Seeding,
    Training,
    Scoring,
    Revealing,
    Retraining,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Seeding => "seeding",
            Self::Training => "training",
            Self::Scoring => "scoring",
            Self::Revealing => "revealing",
            Self::Retraining => "retraining",
        };
        f.write_str(s)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CalError>;
