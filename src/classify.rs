//! Media classification client.
//!
//! Resolves an opaque media reference to bytes, then asks the external
//! recognition service for a ranked labeling. Both steps sit behind traits so
//! the engine can be exercised without the network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::ClassifyError;

/// Number of candidates offered in manual-disambiguation mode.
pub const MANUAL_TOPK: usize = 3;

/// One ranked labeling from the recognition service. Scores are in [0, 1],
/// returned in descending order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    pub score: f64,
}

impl Candidate {
    /// Score as a whole percentage, for user-facing messages.
    pub fn percent(&self) -> u32 {
        (self.score * 100.0).round() as u32
    }
}

/// Resolves a transport-issued media reference to raw image bytes.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, ClassifyError>;
}

/// Ranked image classification.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the referenced image, returning up to `topk` candidates,
    /// best first. Never returns an empty list.
    async fn classify(
        &self,
        reference: &str,
        topk: usize,
    ) -> Result<Vec<Candidate>, ClassifyError>;
}

/// Fetches media over HTTP from the transport's file-retrieval endpoint.
pub struct HttpMediaFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMediaFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, ClassifyError> {
        let url = format!("{}/{reference}", self.base_url);
        let resp = self.client.get(&url).send().await.map_err(|e| {
            ClassifyError::Fetch {
                reference: reference.to_string(),
                reason: e.to_string(),
            }
        })?;

        if !resp.status().is_success() {
            return Err(ClassifyError::Fetch {
                reference: reference.to_string(),
                reason: format!("status {}", resp.status()),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| ClassifyError::Fetch {
            reference: reference.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct TopkResponse {
    topk: Vec<Candidate>,
}

/// HTTP client for the classification endpoint: multipart POST of the image
/// bytes with a `topk` query parameter and an optional API-key header.
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    fetcher: Arc<dyn MediaFetcher>,
}

impl HttpClassifier {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<SecretString>,
        fetcher: Arc<dyn MediaFetcher>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            fetcher,
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        reference: &str,
        topk: usize,
    ) -> Result<Vec<Candidate>, ClassifyError> {
        let bytes = self.fetcher.fetch(reference).await?;

        let part = Part::bytes(bytes)
            .file_name("item.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| ClassifyError::Upstream {
                reason: e.to_string(),
            })?;
        let form = Form::new().part("image", part);

        let mut req = self
            .client
            .post(&self.endpoint)
            .query(&[("topk", topk)])
            .multipart(form);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key.expose_secret());
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ClassifyError::Timeout
            } else {
                ClassifyError::Upstream {
                    reason: e.to_string(),
                }
            }
        })?;

        if !resp.status().is_success() {
            return Err(ClassifyError::Upstream {
                reason: format!("status {}", resp.status()),
            });
        }

        let ranking: TopkResponse =
            resp.json().await.map_err(|e| ClassifyError::Upstream {
                reason: e.to_string(),
            })?;
        if ranking.topk.is_empty() {
            return Err(ClassifyError::Upstream {
                reason: "empty ranking".to_string(),
            });
        }

        let mut candidates = ranking.topk;
        candidates.truncate(topk);
        Ok(candidates)
    }
}
