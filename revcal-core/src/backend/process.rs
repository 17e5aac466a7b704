//! Local-process ranking backend.
//!
//! Training runs `<train_program> <collection> <model> train <training_file>`;
//! scoring runs `<score_program> <collection> <model> -n <count> -e <exclude_file>`
//! and reads `docid score` lines from stdout.

use super::{ModelHandle, RankingBackend, ScoredDoc};
use crate::error::{CalError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

const NAME: &str = "process";

pub struct ProcessBackend {
    collection: String,
    train_program: PathBuf,
    score_program: PathBuf,
}

impl ProcessBackend {
    pub fn new(collection: &str, train_program: &Path, score_program: &Path) -> Self {
        Self {
            collection: collection.to_string(),
            train_program: train_program.to_path_buf(),
            score_program: score_program.to_path_buf(),
        }
    }

    async fn run(&self, operation: &str, command: &mut Command) -> Result<Output> {
        let output = command
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CalError::backend(NAME, operation, format!("failed to spawn: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CalError::backend(
                NAME,
                operation,
                format!("{} {}", output.status, stderr.trim()),
            ));
        }
        Ok(output)
    }
}

#[async_trait]
impl RankingBackend for ProcessBackend {
    fn name(&self) -> &str {
        NAME
    }

    async fn train(&self, model_path: &Path, training_file: &Path) -> Result<ModelHandle> {
        debug!(
            program = %self.train_program.display(),
            model = %model_path.display(),
            training_file = %training_file.display(),
            "Training model"
        );
        let mut command = Command::new(&self.train_program);
        command
            .arg(&self.collection)
            .arg(model_path)
            .arg("train")
            .arg(training_file);
        self.run("train", &mut command).await?;
        Ok(ModelHandle::new(model_path))
    }

    async fn score(
        &self,
        model: &ModelHandle,
        exclude_file: &Path,
        n: usize,
    ) -> Result<Vec<ScoredDoc>> {
        debug!(
            program = %self.score_program.display(),
            model = %model.path().display(),
            n,
            "Scoring collection"
        );
        let mut command = Command::new(&self.score_program);
        command
            .arg(&self.collection)
            .arg(model.path())
            .arg("-n")
            .arg(n.to_string())
            .arg("-e")
            .arg(exclude_file);
        let output = self.run("score", &mut command).await?;
        parse_score_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse `docid score` lines, skipping blank ones.
pub fn parse_score_output(stdout: &str) -> Result<Vec<ScoredDoc>> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next().map(str::parse::<f64>), fields.next()) {
                (Some(docid), Some(Ok(score)), None) => Ok(ScoredDoc::new(docid, score)),
                _ => Err(CalError::MalformedBackendOutput {
                    backend: NAME.to_string(),
                    message: format!("expected 'docid score', got {line:?}"),
                }),
            }
        })
        .collect()
}
