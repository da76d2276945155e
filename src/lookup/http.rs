//! HTTP implementation of the place source
//!
//! Talks to a place-details JSON endpoint keyed by an opaque id. Endpoint,
//! API key and timeout are injected configuration; the key is never embedded
//! in code.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::{PlaceLookup, PlaceSource};
use crate::config::LookupConfig;
use crate::errors::{AppError, AppResult, LookupError};
use crate::models::{PlaceDetailsResponse, STATUS_NOT_FOUND};

/// Place source backed by an HTTP(S) place-details endpoint.
pub struct HttpPlaceSource {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl HttpPlaceSource {
    /// Build a source from configuration.
    ///
    /// The request timeout doubles as the per-flight lookup timeout: when it
    /// expires, every caller coalesced on the flight sees
    /// [`LookupError::Timeout`].
    pub fn new(config: &LookupConfig) -> AppResult<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            AppError::configuration(format!(
                "invalid lookup endpoint '{}': {}",
                config.endpoint, e
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("placelink/0.1")
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    fn request_url(&self, id: &str) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            if !self.api_key.is_empty() {
                query.append_pair("key", &self.api_key);
            }
            query.append_pair("placeid", id);
        }
        url
    }
}

#[async_trait]
impl PlaceSource for HttpPlaceSource {
    async fn fetch(&self, id: &str) -> Result<PlaceLookup, LookupError> {
        let response = self
            .client
            .get(self.request_url(id))
            .send()
            .await
            .map_err(|e| LookupError::from_request(id, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::http(
                status.as_u16(),
                status.canonical_reason().unwrap_or("request failed"),
            ));
        }

        let details: PlaceDetailsResponse = response
            .json()
            .await
            .map_err(|e| LookupError::from_request(id, e))?;

        if details.status == STATUS_NOT_FOUND {
            return Ok(PlaceLookup::NotFound);
        }
        let result = details.result.ok_or_else(|| {
            LookupError::parse(format!(
                "place details for {} missing result (status {})",
                id, details.status
            ))
        })?;

        Ok(PlaceLookup::Found {
            location: result.geometry.location,
            closed: result.permanently_closed,
        })
    }
}
