//! Heatmap API client
//!
//! Thin reqwest wrapper over the vantage-api endpoints. Submission never
//! returns an error: every response is classified into an outcome so bulk
//! runs keep going and the caller tallies the mix.

use std::time::Duration;
use thiserror::Error;
use vantage_common::types::{
    CoverageResponse, StatsResponse, SubmitPointRequest, SubmitPointResponse,
};

const USER_AGENT: &str = "Vantage/0.1.0 (https://github.com/vantage-maps/vantage)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Client errors for the query endpoints
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Classified result of one point submission
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// 201: a new point was stored
    Created(SubmitPointResponse),
    /// 200 with "already exists": the place was rated before
    Duplicate(SubmitPointResponse),
    /// 400 naming missing imagery: nothing to rate here
    NoImagery,
    /// Any other 400: bad submission
    Rejected(String),
    /// Request timed out
    Timeout,
    /// Transport or server failure
    Failed(String),
}

/// HTTP client for a running vantage-api instance
#[derive(Clone)]
pub struct HeatmapClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HeatmapClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Submit one address (or `"lat,lng"` string) and classify the outcome
    pub async fn submit_address(&self, address: &str) -> SubmitOutcome {
        let request = SubmitPointRequest::address_only(address);

        let response = match self
            .http_client
            .post(format!("{}/point", self.base_url))
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return SubmitOutcome::Timeout,
            Err(e) => return SubmitOutcome::Failed(e.to_string()),
        };

        let status = response.status();
        match status.as_u16() {
            201 => match response.json::<SubmitPointResponse>().await {
                Ok(body) => SubmitOutcome::Created(body),
                Err(e) => SubmitOutcome::Failed(format!("Unreadable response: {}", e)),
            },
            200 => match response.json::<SubmitPointResponse>().await {
                Ok(body) => SubmitOutcome::Duplicate(body),
                Err(e) => SubmitOutcome::Failed(format!("Unreadable response: {}", e)),
            },
            400 => {
                let message = error_message(response).await;
                if message.to_lowercase().contains("imagery") {
                    SubmitOutcome::NoImagery
                } else {
                    SubmitOutcome::Rejected(message)
                }
            }
            code => {
                let message = error_message(response).await;
                SubmitOutcome::Failed(format!("HTTP {}: {}", code, message))
            }
        }
    }

    /// Fetch dataset statistics
    pub async fn stats(&self) -> Result<StatsResponse, ClientError> {
        self.get_json(&format!("{}/stats", self.base_url)).await
    }

    /// Fetch per-cell point counts at one aggregate resolution
    pub async fn coverage(&self, resolution: u8) -> Result<CoverageResponse, ClientError> {
        self.get_json(&format!(
            "{}/coverage?resolution={}",
            self.base_url, resolution
        ))
        .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(ClientError::Api(status.as_u16(), message));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}

/// Best-effort extraction of the API error body's message
async fn error_message(response: reqwest::Response) -> String {
    match response.json::<serde_json::Value>().await {
        Ok(body) => body["error"]["message"]
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| body.to_string()),
        Err(_) => "Unknown error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = HeatmapClient::new("http://127.0.0.1:5860/").unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:5860");
    }
}
