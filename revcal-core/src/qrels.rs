//! Relevance judgment store.
//!
//! Loads `topic iteration docid relevance` lines for a single topic. The store
//! is read-only once loaded and is the ground truth the review loop reveals
//! from.

use crate::error::{CalError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// One parsed judgment line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevanceJudgment {
    pub topic: String,
    pub docid: String,
    pub relevance: i32,
}

/// Ground-truth relevance labels for one topic.
#[derive(Debug, Clone, Default)]
pub struct Qrels {
    topic: String,
    labels: HashMap<String, i32>,
}

impl Qrels {
    /// Load the judgments for `topic` from a qrels file.
    ///
    /// Lines for other topics are ignored and blank lines are skipped. If a
    /// docid is judged more than once for the topic, the last line wins.
    pub fn load(path: &Path, topic: &str) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut qrels = Self::new(topic);

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let malformed = || CalError::MalformedJudgmentLine {
                path: path.to_path_buf(),
                line: idx + 1,
                content: line.clone(),
            };
            let (line_topic, docid, relevance) = split_line(&line).ok_or_else(malformed)?;
            if line_topic != topic {
                continue;
            }
            let relevance = relevance.parse::<i32>().map_err(|_| malformed())?;
            qrels.insert(RelevanceJudgment {
                topic: topic.to_string(),
                docid: docid.to_string(),
                relevance,
            });
        }

        debug!(
            topic,
            judged = qrels.len(),
            relevant = qrels.total_relevant(),
            "Loaded judgments"
        );
        Ok(qrels)
    }

    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            labels: HashMap::new(),
        }
    }

    /// Record a judgment, replacing any earlier label for the same docid.
    pub fn insert(&mut self, judgment: RelevanceJudgment) {
        if let Some(previous) = self.labels.insert(judgment.docid.clone(), judgment.relevance) {
            warn!(
                topic = %self.topic,
                docid = %judgment.docid,
                previous,
                current = judgment.relevance,
                "Duplicate judgment, keeping the later one"
            );
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Relevance label for `docid`, 0 when it was never judged.
    pub fn relevance_of(&self, docid: &str) -> i32 {
        self.labels.get(docid).copied().unwrap_or(0)
    }

    pub fn is_relevant(&self, docid: &str) -> bool {
        self.relevance_of(docid) > 0
    }

    /// Number of documents with a strictly positive label.
    pub fn total_relevant(&self) -> usize {
        self.labels.values().filter(|&&rel| rel > 0).count()
    }

    /// Number of judged documents, relevant or not.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// `(topic, docid, relevance)` fields of a judgment line. The label is only
/// parsed for lines of the requested topic.
fn split_line(line: &str) -> Option<(&str, &str, &str)> {
    let mut fields = line.split_whitespace();
    let topic = fields.next()?;
    let _iteration = fields.next()?;
    let docid = fields.next()?;
    let relevance = fields.next()?;
    Some((topic, docid, relevance))
}
