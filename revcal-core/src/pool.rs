//! Ranked candidate pool reader.
//!
//! Pool lines are `topic docid rank ...`; anything after the rank is ignored.
//! Entries for other topics are filtered out silently.

use crate::error::{CalError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One candidate from the pool file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    pub topic: String,
    pub docid: String,
    pub rank: u32,
}

/// Lazily streams entries for a single topic from a pool file.
pub struct PoolReader {
    path: PathBuf,
    topic: String,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl PoolReader {
    pub fn open(path: &Path, topic: &str) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            topic: topic.to_string(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }

    fn malformed(&self, content: String) -> CalError {
        CalError::MalformedPoolLine {
            path: self.path.clone(),
            line: self.line_no,
            content,
        }
    }
}

impl Iterator for PoolReader {
    type Item = Result<PoolEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let (topic, docid, rank) = match split_line(&line) {
                Some(fields) => fields,
                None => return Some(Err(self.malformed(line.clone()))),
            };
            if topic != self.topic {
                continue;
            }
            let Ok(rank) = rank.parse::<u32>() else {
                return Some(Err(self.malformed(line.clone())));
            };
            return Some(Ok(PoolEntry {
                topic: topic.to_string(),
                docid: docid.to_string(),
                rank,
            }));
        }
    }
}

/// Docids to seed the training set with: entries for `topic` whose rank is at
/// most `rank_cutoff`, in file order. A docid listed more than once is kept
/// at its first occurrence only.
pub fn seed_candidates(path: &Path, topic: &str, rank_cutoff: u32) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();
    for entry in PoolReader::open(path, topic)? {
        let entry = entry?;
        if entry.rank > rank_cutoff {
            continue;
        }
        if !seen.insert(entry.docid.clone()) {
            debug!(topic, docid = %entry.docid, rank = entry.rank, "Skipping duplicate pool entry");
            continue;
        }
        seeds.push(entry.docid);
    }
    Ok(seeds)
}

/// `(topic, docid, rank)` fields of a pool line. The rank is only parsed for
/// lines of the requested topic.
fn split_line(line: &str) -> Option<(&str, &str, &str)> {
    let mut fields = line.split_whitespace();
    let topic = fields.next()?;
    let docid = fields.next()?;
    let rank = fields.next()?;
    fields.next()?;
    Some((topic, docid, rank))
}
