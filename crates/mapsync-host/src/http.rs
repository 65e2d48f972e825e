//! HTTP record source.

use mapsync_core::{Error, Record, Result, ViewContext};
use reqwest::Client;
use tracing::debug;

use crate::host::RecordSource;

/// Fetches records with `GET {base_url}?lat=..&lon=..`.
///
/// The endpoint must answer with a JSON array of records.
#[derive(Clone)]
pub struct HttpRecordSource {
    client: Client,
    base_url: String,
}

impl HttpRecordSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl RecordSource for HttpRecordSource {
    async fn fetch_records(&self, hint: &ViewContext) -> Result<Vec<Record>> {
        debug!(
            "Fetching records from {} around {},{}",
            self.base_url, hint.center.lat, hint.center.lon
        );

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("lat", hint.center.lat), ("lon", hint.center.lon)])
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Fetch(format!("API error {}: {}", status, body)));
        }

        response
            .json::<Vec<Record>>()
            .await
            .map_err(|e| Error::Fetch(format!("Invalid record payload: {}", e)))
    }
}
