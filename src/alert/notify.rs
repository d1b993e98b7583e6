//! Outbound notification seam for the two external collaborators.
//!
//! Both calls are best-effort: the escalator logs failures and moves on,
//! and a stalled collaborator can only hold the batch for the client
//! timeout, never indefinitely.

use anyhow::Result;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Transport seam for the emergency-notification and dashboard
/// collaborators. Tests substitute a recording fake.
#[async_trait::async_trait]
pub trait Dispatch: Send + Sync {
    /// POST an alert payload to the emergency-notification collaborator.
    async fn send_emergency(&self, payload: &Value) -> Result<()>;

    /// POST an update payload to the dashboard collaborator.
    async fn send_dashboard_update(&self, payload: &Value) -> Result<()>;
}

/// HTTP-backed dispatcher with a bounded per-request timeout.
pub struct HttpDispatch {
    client: Client,
    notification_url: String,
    dashboard_url: String,
}

impl HttpDispatch {
    pub fn new(notification_url: &str, dashboard_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;
        Ok(Self {
            client,
            notification_url: notification_url.trim_end_matches('/').to_string(),
            dashboard_url: dashboard_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, url: &str, payload: &Value) -> Result<()> {
        let response = self.client.post(url).json(payload).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("collaborator returned {}", response.status());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Dispatch for HttpDispatch {
    async fn send_emergency(&self, payload: &Value) -> Result<()> {
        self.post(&format!("{}/emergency", self.notification_url), payload)
            .await
    }

    async fn send_dashboard_update(&self, payload: &Value) -> Result<()> {
        self.post(&format!("{}/updates", self.dashboard_url), payload)
            .await
    }
}
