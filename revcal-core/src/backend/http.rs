//! HTTP ranking backend.
//!
//! Talks to a ranking service exposing `GET /train?model_file=&qrels_file=` and
//! `GET /score?model_file=&num_results=&exclude_file=`, the latter answering
//! with a JSON array of `{docid, score}` objects. Any non-200 answer is fatal.

use super::{ModelHandle, RankingBackend, ScoredDoc};
use crate::config::BackendConfig;
use crate::error::{CalError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const NAME: &str = "http";

pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CalError::config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        Self::new(&config.base_url(), timeout)
    }

    async fn get(&self, operation: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, operation);
        debug!(%url, ?query, "Calling ranking service");
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| CalError::backend(NAME, operation, format!("request failed: {e}")))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(CalError::backend(
                NAME,
                operation,
                format!("HTTP {status}: {}", body.trim()),
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl RankingBackend for HttpBackend {
    fn name(&self) -> &str {
        NAME
    }

    async fn train(&self, model_path: &Path, training_file: &Path) -> Result<ModelHandle> {
        self.get(
            "train",
            &[
                ("model_file", model_path.to_string_lossy().into_owned()),
                ("qrels_file", training_file.to_string_lossy().into_owned()),
            ],
        )
        .await?;
        Ok(ModelHandle::new(model_path))
    }

    async fn score(
        &self,
        model: &ModelHandle,
        exclude_file: &Path,
        n: usize,
    ) -> Result<Vec<ScoredDoc>> {
        let response = self
            .get(
                "score",
                &[
                    ("model_file", model.path().to_string_lossy().into_owned()),
                    ("num_results", n.to_string()),
                    ("exclude_file", exclude_file.to_string_lossy().into_owned()),
                ],
            )
            .await?;
        let body = response
            .text()
            .await
            .map_err(|e| CalError::backend(NAME, "score", format!("reading body: {e}")))?;
        serde_json::from_str(&body).map_err(|e| CalError::MalformedBackendOutput {
            backend: NAME.to_string(),
            message: e.to_string(),
        })
    }
}
