//! Postal address lookup and formatting.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// Normalized address. Lookup-populated fields come only from a successful
/// lookup; `number` and `complement` come from the user's free-text line.
/// Unavailable fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
}

impl Address {
    /// Single-line display form:
    /// `street, number • neighborhood • city/region • complement • postal code`,
    /// dropping whatever is absent.
    pub fn display_line(&self) -> String {
        let street_number = match (&self.street, &self.number) {
            (Some(street), Some(number)) => Some(format!("{street}, {number}")),
            (Some(street), None) => Some(street.clone()),
            (None, Some(number)) => Some(number.clone()),
            (None, None) => None,
        };
        let city_region = match (&self.city, &self.region) {
            (Some(city), Some(region)) => Some(format!("{city}/{region}")),
            (Some(city), None) => Some(city.clone()),
            (None, Some(region)) => Some(region.clone()),
            (None, None) => None,
        };

        [
            street_number,
            self.neighborhood.clone(),
            city_region,
            self.complement.clone(),
            self.postal_code.clone(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" • ")
    }
}

/// Postal code to address resolution.
#[async_trait]
pub trait PostalLookup: Send + Sync {
    /// Resolve a normalized 8-digit postal code.
    async fn lookup(&self, code: &str) -> Result<Address, LookupError>;
}

/// Provider wire shape. Empty strings are treated as absent fields, and the
/// provider signals an unknown code with an explicit error flag rather than
/// a non-200 status.
#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    erro: bool,
    cep: Option<String>,
    logradouro: Option<String>,
    bairro: Option<String>,
    localidade: Option<String>,
    uf: Option<String>,
}

impl LookupResponse {
    fn into_address(self) -> Address {
        Address {
            postal_code: clean(self.cep),
            street: clean(self.logradouro),
            neighborhood: clean(self.bairro),
            city: clean(self.localidade),
            region: clean(self.uf),
            number: None,
            complement: None,
        }
    }
}

fn clean(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

/// HTTP postal lookup client: `GET {base}/{code}/json`.
pub struct HttpPostalLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPostalLookup {
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
impl PostalLookup for HttpPostalLookup {
    async fn lookup(&self, code: &str) -> Result<Address, LookupError> {
        let url = format!("{}/{code}/json", self.base_url);
        let resp = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout
            } else {
                LookupError::Upstream {
                    reason: e.to_string(),
                }
            }
        })?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(LookupError::Upstream {
                reason: format!("status {}", resp.status()),
            });
        }

        let body: LookupResponse =
            resp.json().await.map_err(|e| LookupError::Upstream {
                reason: e.to_string(),
            })?;
        if body.erro {
            return Err(LookupError::NotFound);
        }
        Ok(body.into_address())
    }
}
