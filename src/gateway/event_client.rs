use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use super::{EventGateway, EventSnapshot, GatewayError};

/// reqwest client for `GET {base}/event/{id}`.
#[derive(Clone)]
pub struct HttpEventClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpEventClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build http client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn event_url(&self, event_id: i64) -> String {
        format!("{}/event/{}", self.base_url, event_id)
    }
}

#[async_trait]
impl EventGateway for HttpEventClient {
    async fn get_event(&self, event_id: i64) -> Result<EventSnapshot, GatewayError> {
        let url = self.event_url(event_id);
        tracing::debug!(event_id, url = %url, "Fetching event from catalog");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!(event_id, status = status.as_u16(), "Event catalog refused lookup");
            return Err(GatewayError::NotFound {
                event_id,
                status: status.as_u16(),
            });
        }

        response
            .json::<EventSnapshot>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}
