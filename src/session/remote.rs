//! Remote key/value session backend over HTTP.
//!
//! Contract: `GET {base}/get/{key}` returns the JSON-encoded draft, either
//! bare or enveloped as `{"value": …}` (some backends also string-encode the
//! value inside the envelope); 404 or a null envelope means absent.
//! `POST {base}/set/{key}?ex={seconds}` stores the body with an expiry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};

use crate::draft::Draft;
use crate::error::StoreError;
use crate::session::{SessionStore, draft_key};

pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl RemoteStore {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, op: &str, key: &str) -> String {
        format!("{}/{op}/{key}", self.base_url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token.expose_secret()),
            None => req,
        }
    }
}

#[async_trait]
impl SessionStore for RemoteStore {
    async fn get(&self, conversation_id: &str) -> Result<Option<Draft>, StoreError> {
        let key = draft_key(conversation_id);
        let resp = self
            .authorize(self.client.get(self.url("get", &key)))
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(StoreError::Backend {
                status: resp.status().as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        decode_draft(&body)
    }

    async fn set(
        &self,
        conversation_id: &str,
        draft: &Draft,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let key = draft_key(conversation_id);
        let resp = self
            .authorize(self.client.post(self.url("set", &key)))
            .query(&[("ex", ttl.as_secs())])
            .json(draft)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(StoreError::Backend {
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }
}

/// Decode a stored draft from either a bare body or a `{"value": …}`
/// envelope, tolerating a string-encoded inner value.
fn decode_draft(body: &str) -> Result<Option<Draft>, StoreError> {
    let outer: serde_json::Value =
        serde_json::from_str(body).map_err(|e| StoreError::Decode(e.to_string()))?;

    let inner = match outer {
        serde_json::Value::Object(mut map) if map.contains_key("value") => {
            map.remove("value").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    };

    match inner {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(encoded) => serde_json::from_str(&encoded)
            .map(Some)
            .map_err(|e| StoreError::Decode(e.to_string())),
        value => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::Decode(e.to_string())),
    }
}
