//! Versioned training sets.
//!
//! A [`TrainingSet`] is an insertion-ordered docid → label mapping tagged with
//! the round that produced it. Each round's set strictly extends the previous
//! one, and every set is persisted as `{topic}.train.{round}` so the sequence
//! of files on disk is the authoritative history of a run.

use crate::error::{CalError, Result};
use crate::qrels::Qrels;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One labelled document in a training set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledDoc {
    pub docid: String,
    pub relevance: i32,
}

impl LabeledDoc {
    pub fn new(docid: impl Into<String>, relevance: i32) -> Self {
        Self {
            docid: docid.into(),
            relevance,
        }
    }
}

/// Immutable snapshot of the judgments collected up to a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSet {
    topic: String,
    round: usize,
    docs: Vec<LabeledDoc>,
    index: HashMap<String, usize>,
}

impl TrainingSet {
    /// Build the round-0 set from seed candidates, labelling each from the
    /// judgment store.
    pub fn seed(topic: &str, candidates: &[String], qrels: &Qrels) -> Result<Self> {
        let docs = candidates
            .iter()
            .map(|docid| LabeledDoc::new(docid.clone(), qrels.relevance_of(docid)))
            .collect();
        Self::from_docs(topic, 0, docs)
    }

    /// Build a set for `round`, rejecting repeated docids.
    pub fn from_docs(topic: &str, round: usize, docs: Vec<LabeledDoc>) -> Result<Self> {
        let mut index = HashMap::with_capacity(docs.len());
        for (pos, doc) in docs.iter().enumerate() {
            if index.insert(doc.docid.clone(), pos).is_some() {
                return Err(CalError::DuplicateDocument {
                    docid: doc.docid.clone(),
                    round,
                });
            }
        }
        Ok(Self {
            topic: topic.to_string(),
            round,
            docs,
            index,
        })
    }

    /// The next round's set: every existing entry in order, then `judgments`
    /// in the order given.
    pub fn extend(&self, judgments: &[LabeledDoc]) -> Result<Self> {
        let round = self.round + 1;
        let mut docs = self.docs.clone();
        docs.reserve(judgments.len());
        for judgment in judgments {
            if self.contains(&judgment.docid) {
                return Err(CalError::DuplicateDocument {
                    docid: judgment.docid.clone(),
                    round,
                });
            }
            docs.push(judgment.clone());
        }
        Self::from_docs(&self.topic, round, docs)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn contains(&self, docid: &str) -> bool {
        self.index.contains_key(docid)
    }

    pub fn label(&self, docid: &str) -> Option<i32> {
        self.index.get(docid).map(|&pos| self.docs[pos].relevance)
    }

    pub fn docs(&self) -> &[LabeledDoc] {
        &self.docs
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabeledDoc> {
        self.docs.iter()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn relevant_count(&self) -> usize {
        self.docs.iter().filter(|d| d.relevance > 0).count()
    }
}

/// Reads and writes a topic's per-round training files in a run directory.
#[derive(Debug, Clone)]
pub struct TrainingSetStore {
    dir: PathBuf,
    topic: String,
}

impl TrainingSetStore {
    pub fn new(dir: impl Into<PathBuf>, topic: &str) -> Self {
        Self {
            dir: dir.into(),
            topic: topic.to_string(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Path of `{topic}.train.{round}`.
    pub fn train_path(&self, round: usize) -> PathBuf {
        self.dir.join(format!("{}.train.{}", self.topic, round))
    }

    /// Path of `{topic}.model.{round}`. The file itself belongs to the backend.
    pub fn model_path(&self, round: usize) -> PathBuf {
        self.dir.join(format!("{}.model.{}", self.topic, round))
    }

    /// Persist `set` as the training file for its round.
    ///
    /// Lines are `topic 0 docid relevance` in insertion order. The file is
    /// written to a sibling temp path and renamed into place, so readers never
    /// observe a partial round.
    pub fn write(&self, set: &TrainingSet) -> Result<PathBuf> {
        if set.topic() != self.topic {
            return Err(CalError::TopicMismatch {
                path: self.train_path(set.round()),
                expected: self.topic.clone(),
                found: set.topic().to_string(),
            });
        }
        let path = self.train_path(set.round());
        let tmp = self
            .dir
            .join(format!("{}.train.{}.tmp", self.topic, set.round()));
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            for doc in set.iter() {
                writeln!(out, "{} 0 {} {}", self.topic, doc.docid, doc.relevance)?;
            }
            out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        }
        std::fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Load the training file for `round`.
    ///
    /// A line naming any other topic means the run directory is corrupt and
    /// fails with [`CalError::TopicMismatch`].
    pub fn read(&self, round: usize) -> Result<TrainingSet> {
        let path = self.train_path(round);
        let reader = BufReader::new(File::open(&path)?);
        let mut docs = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let malformed = || CalError::MalformedTrainingLine {
                path: path.clone(),
                line: idx + 1,
                content: line.clone(),
            };
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [topic, _, docid, relevance] = fields[..] else {
                return Err(malformed());
            };
            let relevance: i32 = relevance.parse().map_err(|_| malformed())?;
            if topic != self.topic {
                return Err(CalError::TopicMismatch {
                    path,
                    expected: self.topic.clone(),
                    found: topic.to_string(),
                });
            }
            docs.push(LabeledDoc::new(docid, relevance));
        }
        TrainingSet::from_docs(&self.topic, round, docs)
    }

    pub fn exists(&self, round: usize) -> bool {
        self.train_path(round).exists()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
