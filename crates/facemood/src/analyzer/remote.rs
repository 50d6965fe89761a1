//! HTTP client for the analysis service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::analyzer::{Analysis, Analyzer};
use crate::error::AnalyzeError;
use crate::normalizer::data_uri;
use crate::store::JPEG_CONTENT_TYPE;

/// Placeholder stored when the service answers without a `results` field.
pub const NO_RESULT: &str = "No result";

/// Posts `{"image": "data:image/jpeg;base64,..."}` to the analysis endpoint.
///
/// One attempt per call; the client timeout bounds it.
pub struct RemoteAnalyzer {
    client: Client,
    url: String,
}

impl RemoteAnalyzer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AnalyzeError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Analyzer for RemoteAnalyzer {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn analyze(&self, jpeg: &[u8]) -> Result<Analysis, AnalyzeError> {
        let payload = json!({ "image": data_uri::encode(JPEG_CONTENT_TYPE, jpeg) });

        log::debug!("Posting {} byte image to {}", jpeg.len(), self.url);

        let response = self.client.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| AnalyzeError::Decode(e.to_string()))?;

        let results = value
            .get("results")
            .cloned()
            .unwrap_or_else(|| serde_json::Value::String(NO_RESULT.to_string()));

        Ok(Analysis(results))
    }
}
