//! Outbound campaign notifications.
//!
//! A single HTTP endpoint accepts campaign sends. Delivery is best-effort
//! fire-and-forget: a non-2xx response is a step failure only, never fatal
//! to the caller, and failed sends are not retried.

pub mod orchestrator;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("campaign API error {status}: {message}")]
    Api { status: u16, message: String },
}

/// Media attachment for a campaign send (e.g. the brochure PDF).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignMedia {
    pub url: String,
    pub filename: String,
}

/// Payload of one campaign send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRequest {
    pub api_key: String,
    pub campaign_name: String,
    /// Recipient phone number.
    pub destination: String,
    pub user_name: String,
    pub template_params: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<CampaignMedia>,
}

/// Static configuration for the campaign endpoint.
#[derive(Debug, Clone)]
pub struct CampaignConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Fixed recipient for internal new-lead alerts.
    pub internal_recipient: String,
    /// Hosted brochure document attached to the document-send step.
    pub brochure_url: Option<String>,
}

/// Seam for the campaign transport so orchestration is testable without a
/// network.
#[async_trait]
pub trait CampaignSender: Send + Sync {
    async fn send(&self, request: &CampaignRequest) -> Result<(), NotifyError>;
}

/// Production sender over reqwest. One attempt per send; transient
/// failures are recorded by the orchestrator, not retried.
pub struct HttpCampaignSender {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCampaignSender {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl CampaignSender for HttpCampaignSender {
    async fn send(&self, request: &CampaignRequest) -> Result<(), NotifyError> {
        let resp = self.client.post(&self.endpoint).json(request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
